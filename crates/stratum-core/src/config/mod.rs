//! Project configuration: TOML schema and parsing.

pub mod parser;
pub mod schema;

pub use parser::{
    parse_project_toml, parse_project_toml_str, parse_root_toml, parse_scope_data_toml,
    parse_toml_str,
};
pub use schema::{
    CONFIG_FILE, ProjectConfig, ProjectSection, RootConfig, RootSection, ScopeDataConfig,
};
