#![allow(dead_code)]

use std::sync::Arc;

use stratum_core::project::Project;
use stratum_core::root::{Root, RootDependency, ScopeMatch};
use stratum_core::scope::{ScopeDataNode, ScopeType};

pub fn scope_types() -> Vec<ScopeType> {
    vec![ScopeType::new("account"), ScopeType::new("region")]
}

pub fn scope_data() -> Vec<ScopeDataNode> {
    vec![
        ScopeDataNode::new("account", "acme")
            .with_attribute("owner", "platform")
            .with_child(ScopeDataNode::new("region", "us-west-1"))
            .with_child(ScopeDataNode::new("region", "us-east-1"))
            .with_child(ScopeDataNode::new("region", "eu-west-1")),
        ScopeDataNode::new("account", "globex").with_child(ScopeDataNode::new("region", "us-west-1")),
    ]
}

/// web -> vpc -> account-bootstrap, with bootstrap at the account level.
pub fn layered_roots() -> Vec<Root> {
    vec![
        Root::new("account-bootstrap", &["account"]),
        Root::new("vpc", &["account", "region"]).with_dependency(RootDependency::new("account-bootstrap")),
        Root::new("web", &["account", "region"]).with_dependency(RootDependency::new("vpc")),
    ]
}

pub fn project(roots: Vec<Root>) -> Arc<Project> {
    Arc::new(Project::new("fixture", scope_types(), &scope_data(), roots).unwrap())
}

pub fn layered_project() -> Arc<Project> {
    project(layered_roots())
}

pub fn us_only(root: Root) -> Root {
    root.with_scope_match(ScopeMatch::new([("account", ".*"), ("region", "us-.*")]))
}
