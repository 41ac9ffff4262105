//! Integration tests for types

#[cfg(test)]
mod tests {
    use pkbridge_errors::EngineErrorCode;
    use pkbridge_types::*;
    use proptest::prelude::*;

    #[test]
    fn test_package_from_engine_json() {
        let pkg: Package = serde_json::from_str(
            r#"{
                "name": "foo",
                "version": "1.0-1",
                "arch": "x86_64",
                "repository": "extra",
                "optdepends": ["bar: extra features", "baz>=2"]
            }"#,
        )
        .unwrap();

        assert_eq!(pkg.package_id(), "foo;1.0-1;x86_64;extra");
        assert_eq!(pkg.optdepends[0].description.as_deref(), Some("extra features"));
        assert_eq!(pkg.optdepends[1].modifier, DepMod::Ge);
        assert!(pkg.deltas.is_empty());
        assert_eq!(pkg.to_string(), "foo-1.0-1");
    }

    #[test]
    fn test_invalid_depend_is_a_deserialization_error() {
        let result: Result<Package, _> =
            serde_json::from_str(r#"{"name": "foo", "version": "1", "optdepends": [">=1"]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_failure_details_shape() {
        let failure: EngineFailure = serde_json::from_str(
            r#"{
                "code": "unsatisfied_deps",
                "message": "could not satisfy dependencies",
                "details": {"kind": "unsatisfied_deps", "entries": [
                    {"target": "bar", "depend": "foo>=2"}
                ]}
            }"#,
        )
        .unwrap();

        assert_eq!(failure.code, EngineErrorCode::UnsatisfiedDeps);
        let FailureDetails::UnsatisfiedDeps(missing) = &failure.details else {
            panic!("unexpected details: {:?}", failure.details);
        };
        assert_eq!(missing[0].depend.to_string(), "foo>=2");
        assert!(missing[0].causing.is_none());

        let bare = EngineFailure::new(EngineErrorCode::DiskSpace, "not enough free disk space");
        assert!(bare.details.is_empty());
        assert!(FailureDetails::FileConflicts(vec![]).is_empty());
    }

    #[test]
    fn test_role_names_match_serde() {
        for role in [
            Role::InstallFiles,
            Role::SimulateInstallFiles,
            Role::InstallPackages,
            Role::DownloadPackages,
            Role::UpdatePackages,
            Role::RemovePackages,
        ] {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{role}\""));
        }
    }

    #[test]
    fn test_status_default_is_idle() {
        assert_eq!(Status::default(), Status::Idle);
        assert_eq!(
            serde_json::to_string(&Status::DependencyResolution).unwrap(),
            r#""dependency_resolution""#
        );
    }

    fn depend_strategy() -> impl Strategy<Value = Depend> {
        (
            "[a-z][a-z0-9+_.-]{0,15}",
            prop::sample::select(vec![
                DepMod::Any,
                DepMod::Eq,
                DepMod::Ge,
                DepMod::Le,
                DepMod::Gt,
                DepMod::Lt,
            ]),
            "[0-9][0-9a-z.+-]{0,8}",
            prop::option::of("[a-z][a-z ]{0,20}[a-z]"),
        )
            .prop_map(|(name, modifier, version, description)| Depend {
                name,
                version: (modifier != DepMod::Any).then_some(version),
                modifier,
                description,
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        #[test]
        fn depend_display_parses_back(depend in depend_strategy()) {
            let parsed: Depend = depend.to_string().parse().unwrap();
            prop_assert_eq!(parsed, depend);
        }

        #[test]
        fn sorted_depends_are_grouped_by_name(
            mut depends in prop::collection::vec(depend_strategy(), 0..16)
        ) {
            depends.sort();
            prop_assert!(depends.windows(2).all(|pair| pair[0].name <= pair[1].name));
        }
    }
}
