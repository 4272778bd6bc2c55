//! Splits command lines between the configuration loader and `clap`.
//!
//! Both binaries accept configuration flags alongside their own actions.
//! `ortho_config` rejects flags it does not know, so the configuration
//! flags (and their values) are routed to it while everything else is left
//! for the binary's own parser. The program name is kept at the front of
//! both halves.

use std::ffi::{OsStr, OsString};

/// Flags understood by the configuration loader.
pub const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--socket-path",
    "--model",
    "--language",
    "--model-cache",
    "--engine-command",
    "--engine-device",
    "--engine-compute-type",
    "--max-connections",
    "--read-timeout-secs",
    "--drain-timeout-secs",
    "--log-filter",
    "--log-format",
];

/// Result of splitting a command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentPartition {
    /// Arguments for [`crate::Config::load_from_iter`].
    pub config_arguments: Vec<OsString>,
    /// Arguments for the binary's own parser.
    pub action_arguments: Vec<OsString>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagAction {
    Include { needs_value: bool },
    Skip,
}

fn classify(argument: &OsStr) -> FlagAction {
    let text = argument.to_string_lossy();
    if !text.starts_with("--") {
        return FlagAction::Skip;
    }

    let mut parts = text.splitn(2, '=');
    let flag = parts.next().unwrap_or_default();
    let has_inline_value = parts.next().is_some();

    if CONFIG_CLI_FLAGS.contains(&flag) {
        FlagAction::Include {
            needs_value: !has_inline_value,
        }
    } else {
        FlagAction::Skip
    }
}

/// Routes configuration flags to the loader and leaves the rest in order.
///
/// Flags may appear anywhere on the command line. A configuration flag
/// written without `=value` consumes the following argument.
#[must_use]
pub fn partition_config_arguments(args: &[OsString]) -> ArgumentPartition {
    let mut iter = args.iter();
    let Some(program) = iter.next() else {
        return ArgumentPartition {
            config_arguments: Vec::new(),
            action_arguments: Vec::new(),
        };
    };

    let mut config_arguments = vec![program.clone()];
    let mut action_arguments = vec![program.clone()];

    while let Some(argument) = iter.next() {
        match classify(argument) {
            FlagAction::Include { needs_value } => {
                config_arguments.push(argument.clone());
                if needs_value && let Some(value) = iter.next() {
                    config_arguments.push(value.clone());
                }
            }
            FlagAction::Skip => action_arguments.push(argument.clone()),
        }
    }

    ArgumentPartition {
        config_arguments,
        action_arguments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[rstest]
    #[case("--log-filter=debug", FlagAction::Include { needs_value: false })]
    #[case("--log-filter", FlagAction::Include { needs_value: true })]
    #[case("transcribe", FlagAction::Skip)]
    #[case("--list-models", FlagAction::Skip)]
    fn classifies_flags(#[case] argument: &str, #[case] expected: FlagAction) {
        assert_eq!(classify(OsStr::new(argument)), expected);
    }

    #[test]
    fn splits_interleaved_arguments() {
        let partition = partition_config_arguments(&os(&[
            "murmurd",
            "--model",
            "tiny",
            "--download",
            "base",
            "--language=en",
        ]));
        assert_eq!(
            partition.config_arguments,
            os(&["murmurd", "--model", "tiny", "--language=en"])
        );
        assert_eq!(
            partition.action_arguments,
            os(&["murmurd", "--download", "base"])
        );
    }

    #[test]
    fn empty_command_line_yields_empty_partition() {
        let partition = partition_config_arguments(&[]);
        assert!(partition.config_arguments.is_empty());
        assert!(partition.action_arguments.is_empty());
    }

    #[test]
    fn trailing_flag_without_value_is_forwarded_to_loader() {
        let partition = partition_config_arguments(&os(&["murmur", "--socket-path"]));
        assert_eq!(
            partition.config_arguments,
            os(&["murmur", "--socket-path"])
        );
        assert_eq!(partition.action_arguments, os(&["murmur"]));
    }
}
