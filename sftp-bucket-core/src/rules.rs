//! Maps a file name to the first applicable transfer rule.

use crate::config::{Defaults, TransferRule};

/// Returns the first rule, in declared order, whose effective extension
/// matches the end of `file_name` (case-insensitive) and whose pattern is a
/// literal prefix of `file_name` (case-sensitive). `None` if nothing matches.
pub fn match_rule<'a>(
    file_name: &str,
    rules: &'a [TransferRule],
    defaults: &Defaults,
) -> Option<&'a TransferRule> {
    let lowered = file_name.to_lowercase();
    rules.iter().find(|rule| {
        lowered.ends_with(rule.effective_extension(defaults))
            && file_name.starts_with(&rule.file_pattern)
    })
}
