//! Process configuration: bind address, queue capacities, output path, and
//! log level/format, loaded from CLI flags with defaults.
//!
//! Parsed by hand with `std::env::args()`, in the same style as the
//! original `get_output_dir` - no flag-parsing framework, since none is
//! otherwise pulled into this crate.

use anyhow::{Context, Result, bail};

#[derive(Debug, Clone)]
pub struct Config {
    /// Address the Ingress stage binds its UDP socket to.
    pub bind_addr: String,
    /// Where Egress writes CSV output; `-` means stdout.
    pub output_path: String,
    pub in_queue_capacity: usize,
    pub out_queue_capacity: usize,
    pub log_level: String,
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9000".to_string(),
            output_path: "-".to_string(),
            in_queue_capacity: crate::spsc::DEFAULT_CAPACITY,
            out_queue_capacity: crate::spsc::DEFAULT_CAPACITY,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl Config {
    /// Parses `--bind ADDR`, `--output PATH`, `--in-capacity N`,
    /// `--out-capacity N`, `--log-level LEVEL`, and `--log-json` from the
    /// process's own argv, falling back to defaults for anything not
    /// passed.
    pub fn from_args() -> Result<Self> {
        let args: Vec<String> = std::env::args().collect();
        Self::from_arg_strings(&args[1..])
    }

    fn from_arg_strings(args: &[String]) -> Result<Self> {
        let mut cfg = Self::default();
        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--bind" => {
                    cfg.bind_addr = next_value(args, &mut i, "--bind")?;
                }
                "--output" => {
                    cfg.output_path = next_value(args, &mut i, "--output")?;
                }
                "--in-capacity" => {
                    cfg.in_queue_capacity = next_value(args, &mut i, "--in-capacity")?
                        .parse()
                        .context("--in-capacity must be a power-of-two integer")?;
                }
                "--out-capacity" => {
                    cfg.out_queue_capacity = next_value(args, &mut i, "--out-capacity")?
                        .parse()
                        .context("--out-capacity must be a power-of-two integer")?;
                }
                "--log-level" => {
                    cfg.log_level = next_value(args, &mut i, "--log-level")?;
                }
                "--log-json" => {
                    cfg.log_json = true;
                    i += 1;
                }
                other => bail!("unrecognized argument: {other}"),
            }
        }

        if !cfg.in_queue_capacity.is_power_of_two() || !cfg.out_queue_capacity.is_power_of_two() {
            bail!("queue capacities must be powers of two");
        }

        Ok(cfg)
    }
}

fn next_value(args: &[String], i: &mut usize, flag: &str) -> Result<String> {
    let value = args.get(*i + 1).cloned().with_context(|| format!("{flag} requires a value"))?;
    *i += 2;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_when_no_args_given() {
        let cfg = Config::from_arg_strings(&[]).unwrap();
        assert_eq!(cfg.bind_addr, "127.0.0.1:9000");
        assert_eq!(cfg.output_path, "-");
    }

    #[test]
    fn overrides_bind_and_output() {
        let args = strs(&["--bind", "0.0.0.0:4000", "--output", "/tmp/out.csv"]);
        let cfg = Config::from_arg_strings(&args).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:4000");
        assert_eq!(cfg.output_path, "/tmp/out.csv");
    }

    #[test]
    fn rejects_non_power_of_two_capacity() {
        let args = strs(&["--in-capacity", "1000"]);
        assert!(Config::from_arg_strings(&args).is_err());
    }

    #[test]
    fn rejects_unknown_flag() {
        let args = strs(&["--bogus"]);
        assert!(Config::from_arg_strings(&args).is_err());
    }

    #[test]
    fn log_json_is_a_boolean_switch() {
        let args = strs(&["--log-json"]);
        let cfg = Config::from_arg_strings(&args).unwrap();
        assert!(cfg.log_json);
    }
}
