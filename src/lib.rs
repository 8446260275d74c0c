mod bytecode;
pub mod classfile;
pub mod config;
mod constant_pool;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod finding;
pub mod ir;
pub mod opcodes;
pub mod registry;
pub mod report;
pub mod rules;
pub mod scan;

#[cfg(test)]
mod test_support;
