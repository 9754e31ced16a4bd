pub mod backends;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod plan;
pub mod rule;
pub mod table;
pub mod types;

pub use config::{ConfigLoader, ConfigValidator, RulegraphConfig};
pub use data::RuleData;
pub use engine::{RuleEngine, RuleRunRecord, RunSummary};
pub use error::{AppError, DefaultErrorReporter, ErrorReporter};
pub use plan::{load_plan, Plan, PlanNode};
pub use rule::{
    same_rule, PlanDeclaration, Rule, RuleDeclaration, RuleInputs, RuleMeta, RuleRegistry,
    RuleRegistryBuilder, Slot,
};
pub use table::Table;
pub use types::*;
