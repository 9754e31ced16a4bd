//! Backends bundled with the crate. Each exposes `register` so callers can
//! assemble a [`RuleRegistry`](crate::core::rule::RuleRegistry) of their own.

pub mod memory;

use crate::core::rule::RuleRegistryBuilder;

pub fn register_builtins(builder: &mut RuleRegistryBuilder) {
    memory::register(builder);
}
