mod support;

use stratum_core::error::StratumError;
use stratum_core::project::Project;
use stratum_core::root::{Root, RootDependency};
use stratum_core::schedule::{ChainPolicy, Plan};

use support::{layered_project, layered_roots, project, scope_data, scope_types};

fn keys(plan: &Plan) -> Vec<Vec<String>> {
    plan.keys()
        .into_iter()
        .map(|batch| batch.into_iter().map(|k| k.to_string()).collect())
        .collect()
}

#[test]
fn no_chaining_plans_only_the_request() {
    let project = layered_project();
    let plan = project
        .plan("web", &["acme.us-west-1"], ChainPolicy::None)
        .unwrap();

    assert_eq!(
        keys(&plan),
        vec![vec!["web (account.acme.region.us-west-1)"]]
    );
}

#[test]
fn direct_chaining_stops_after_one_hop() {
    let project = layered_project();
    let plan = project
        .plan("web", &["acme.us-west-1"], ChainPolicy::DirectOnly)
        .unwrap();

    assert_eq!(
        keys(&plan),
        vec![
            vec!["vpc (account.acme.region.us-west-1)"],
            vec!["web (account.acme.region.us-west-1)"],
        ]
    );
}

#[test]
fn transitive_chaining_follows_every_hop() {
    let project = layered_project();
    let plan = project
        .plan("web", &["acme.us-west-1"], ChainPolicy::Transitive)
        .unwrap();

    assert_eq!(
        keys(&plan),
        vec![
            vec!["account-bootstrap (account.acme)"],
            vec!["vpc (account.acme.region.us-west-1)"],
            vec!["web (account.acme.region.us-west-1)"],
        ]
    );
}

#[test]
fn shared_dependencies_are_planned_once() {
    let project = layered_project();
    let plan = project
        .plan("web", &[] as &[&str], ChainPolicy::Transitive)
        .unwrap();

    let sizes: Vec<usize> = plan.batches().iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![2, 4, 4]);
    assert_eq!(plan.unit_count(), 10);
}

#[test]
fn dependencies_always_run_in_earlier_batches() {
    let project = layered_project();
    let plan = project
        .plan("web", &[] as &[&str], ChainPolicy::Transitive)
        .unwrap();
    let matcher = project.matcher();

    for (index, batch) in plan.batches().iter().enumerate() {
        for unit in batch {
            for dependency in unit.root().dependencies() {
                let ancestor = project.root(&dependency.root).unwrap();
                let scope = matcher
                    .resolve_dependency_scope(
                        unit.root().name(),
                        ancestor,
                        unit.scope(),
                        &dependency.scopes,
                    )
                    .unwrap();
                let key = stratum_core::schedule::UnitKey {
                    root: ancestor.name().to_string(),
                    address: scope.address(),
                };
                let dep_batch = plan.batch_of(&key).expect("dependency is planned");
                assert!(dep_batch < index, "{key} must run before {unit}");
            }
        }
    }
}

#[test]
fn requested_units_are_in_the_last_batch() {
    let project = layered_project();
    let plan = project
        .plan("vpc", &["*.us-west-1"], ChainPolicy::Transitive)
        .unwrap();

    let last = plan.batches().last().unwrap();
    assert_eq!(last.len(), 2);
    assert!(last.iter().all(|unit| unit.root().name() == "vpc"));
}

#[test]
fn diamond_places_units_below_their_deepest_dependent() {
    // a -> b -> d, a -> c -> b
    let project = project(vec![
        Root::new("a", &["account"])
            .with_dependency(RootDependency::new("b"))
            .with_dependency(RootDependency::new("c")),
        Root::new("b", &["account"]).with_dependency(RootDependency::new("d")),
        Root::new("c", &["account"]).with_dependency(RootDependency::new("b")),
        Root::new("d", &["account"]),
    ]);

    let plan = project
        .plan("a", &["acme"], ChainPolicy::Transitive)
        .unwrap();

    assert_eq!(
        keys(&plan),
        vec![
            vec!["d (account.acme)"],
            vec!["b (account.acme)"],
            vec!["c (account.acme)"],
            vec!["a (account.acme)"],
        ]
    );
}

#[test]
fn override_selects_another_scope() {
    let mut roots = layered_roots();
    roots.push(
        Root::new("peering", &["account", "region"])
            .with_dependency(RootDependency::new("vpc").with_scope("region", "us-east-1")),
    );
    let project = project(roots);

    let plan = project
        .plan("peering", &["acme.us-west-1"], ChainPolicy::DirectOnly)
        .unwrap();

    assert_eq!(
        keys(&plan),
        vec![
            vec!["vpc (account.acme.region.us-east-1)"],
            vec!["peering (account.acme.region.us-west-1)"],
        ]
    );
}

#[test]
fn ambiguous_override_is_rejected() {
    let mut roots = layered_roots();
    roots.push(
        Root::new("peering", &["account", "region"])
            .with_dependency(RootDependency::new("vpc").with_scope("region", "us-.*")),
    );
    let project = project(roots);

    let err = project
        .plan("peering", &["acme.us-west-1"], ChainPolicy::DirectOnly)
        .unwrap_err();

    let StratumError::DependencyScopeAmbiguous { count, candidates, .. } = &err else {
        panic!("expected an ambiguity error, got {err}");
    };
    assert_eq!(*count, 2);
    assert_eq!(candidates.len(), 2);
}

#[test]
fn unmatched_override_is_rejected() {
    let mut roots = layered_roots();
    roots.push(
        Root::new("peering", &["account", "region"])
            .with_dependency(RootDependency::new("vpc").with_scope("region", "ap-south-1")),
    );
    let project = project(roots);

    let err = project
        .plan("peering", &["acme.us-west-1"], ChainPolicy::DirectOnly)
        .unwrap_err();
    assert!(matches!(err, StratumError::DependencyScopeNotFound { .. }));
}

#[test]
fn dependency_deeper_than_dependent_is_rejected() {
    let project = project(vec![
        Root::new("account-bootstrap", &["account"]).with_dependency(RootDependency::new("vpc")),
        Root::new("vpc", &["account", "region"]),
    ]);

    let err = project
        .plan("account-bootstrap", &["acme"], ChainPolicy::DirectOnly)
        .unwrap_err();
    assert!(matches!(err, StratumError::MissingInheritedScopeType { .. }));
}

#[test]
fn cyclic_project_is_rejected_at_load() {
    let roots = vec![
        Root::new("a", &["account"]).with_dependency(RootDependency::new("b")),
        Root::new("b", &["account"]).with_dependency(RootDependency::new("a")),
    ];

    let err = Project::new("cyclic", scope_types(), &scope_data(), roots).unwrap_err();
    assert!(err.to_string().contains("cyclical dependency"));
}

#[test]
fn unknown_root_is_reported() {
    let err = layered_project()
        .plan("missing", &[] as &[&str], ChainPolicy::None)
        .unwrap_err();
    assert!(matches!(err, StratumError::UnknownRoot { .. }));
}
