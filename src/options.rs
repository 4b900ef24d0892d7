use super::*;

#[derive(Clone, Default, Debug, Parser)]
pub struct Options {
    #[arg(long, help = "Load configuration from <CONFIG>.")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Load configuration from <CONFIG_DIR>/yamuna.toml.")]
    pub config_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options() {
        let options = Options::default();
        assert!(options.config.is_none());
        assert!(options.config_dir.is_none());
    }

    #[test]
    fn parse_config_flags() {
        let options =
            Options::try_parse_from(["yamuna", "--config", "a.toml", "--config-dir", "conf"])
                .unwrap();

        assert_eq!(options.config, Some("a.toml".into()));
        assert_eq!(options.config_dir, Some("conf".into()));
    }
}
