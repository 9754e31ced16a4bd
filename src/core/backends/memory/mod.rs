//! In-memory backend: rules operating on [`Table`](crate::core::table::Table).

pub mod basic;
pub mod io;
pub mod joins;
pub mod numeric;
pub mod types;
mod validation;

pub use basic::{ProjectRule, RenameRule, SortRule};
pub use io::{ReadJsonFileRule, WriteJsonFileRule};
pub use joins::{InnerJoinRule, JoinRule, LeftJoinRule, OuterJoinRule, RightJoinRule};
pub use numeric::{AbsRule, RoundRule};
pub use types::TypeConversionRule;

use crate::core::rule::{decode_rule, RuleRegistryBuilder};

/// Backend identifier used in declarations and on the command line.
pub const BACKEND: &str = "memory";

pub fn register(builder: &mut RuleRegistryBuilder) {
    builder
        .register(BACKEND, "SortRule", decode_rule::<SortRule>)
        .register(BACKEND, "ProjectRule", decode_rule::<ProjectRule>)
        .register(BACKEND, "RenameRule", decode_rule::<RenameRule>)
        .register(BACKEND, "TypeConversionRule", decode_rule::<TypeConversionRule>)
        .register(BACKEND, "RoundRule", decode_rule::<RoundRule>)
        .register(BACKEND, "AbsRule", decode_rule::<AbsRule>)
        .register(BACKEND, "LeftJoinRule", decode_rule::<LeftJoinRule>)
        .register(BACKEND, "InnerJoinRule", decode_rule::<InnerJoinRule>)
        .register(BACKEND, "OuterJoinRule", decode_rule::<OuterJoinRule>)
        .register(BACKEND, "RightJoinRule", decode_rule::<RightJoinRule>)
        .register(BACKEND, "ReadJsonFileRule", decode_rule::<ReadJsonFileRule>)
        .register(BACKEND, "WriteJsonFileRule", decode_rule::<WriteJsonFileRule>);
}

/// `named_input` setter for unary rules.
macro_rules! named_input_builder {
    ($ty:ty) => {
        impl $ty {
            pub fn named_input(mut self, name: impl Into<String>) -> Self {
                self.named_input = Some(name.into());
                self
            }
        }
    };
}

pub(crate) use named_input_builder;
