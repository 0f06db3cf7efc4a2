mod rules_file;

pub use rules_file::{RulesFile, RulesFileError};
