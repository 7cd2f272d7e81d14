use crate::{
    ErrorHandling, LocalSettings, ResolvedSettings, Setting, SettingUse, SkipStrategy,
};

fn inherited_ws() -> ResolvedSettings {
    ResolvedSettings {
        skip: SkipStrategy::whitespaces(),
        error_handling: ErrorHandling::Record,
        ignore_barriers: false,
    }
}

#[test]
fn default_settings_inherit_everything() {
    let settings = LocalSettings::default();
    assert!(settings.is_default());

    let (mine, children) = settings.resolve(inherited_ws());
    assert_eq!(mine, inherited_ws());
    assert_eq!(children, inherited_ws());
}

#[test]
fn local_for_self_leaves_children_inherited() {
    let settings = LocalSettings {
        skip: Setting::local_for_self(SkipStrategy::none()),
        ..LocalSettings::default()
    };
    assert!(!settings.is_default());

    let (mine, children) = settings.resolve(inherited_ws());
    assert_eq!(mine.skip, SkipStrategy::none());
    assert_eq!(children.skip, SkipStrategy::whitespaces());
}

#[test]
fn local_for_children_keeps_self_inherited() {
    let settings = LocalSettings {
        error_handling: Setting::local_for_children(ErrorHandling::NoRecord),
        ..LocalSettings::default()
    };

    let (mine, children) = settings.resolve(inherited_ws());
    assert_eq!(mine.error_handling, ErrorHandling::Record);
    assert_eq!(children.error_handling, ErrorHandling::NoRecord);
}

#[test]
fn local_for_self_and_children_overrides_both() {
    let settings = LocalSettings {
        ignore_barriers: Setting::local(true),
        ..LocalSettings::default()
    };

    let (mine, children) = settings.resolve(inherited_ws());
    assert!(mine.ignore_barriers);
    assert!(children.ignore_barriers);
}

#[test]
fn fields_resolve_independently() {
    let settings = LocalSettings {
        skip: Setting::local(SkipStrategy::none()),
        error_handling: Setting::local_for_self(ErrorHandling::Throw),
        ignore_barriers: Setting {
            value: true,
            mode: SettingUse::Inherit,
        },
    };

    let (mine, children) = settings.resolve(inherited_ws());
    assert_eq!(mine.skip, SkipStrategy::none());
    assert_eq!(children.skip, SkipStrategy::none());
    assert_eq!(mine.error_handling, ErrorHandling::Throw);
    assert_eq!(children.error_handling, ErrorHandling::Record);
    assert!(!mine.ignore_barriers);
}
