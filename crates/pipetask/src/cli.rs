//! CLI argument parsing with clap
//!
//! Every task input can also be supplied the way the agent passes it, as an
//! `INPUT_<NAME>` environment variable.

use camino::Utf8PathBuf;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use pipetask_core::platform::Arch;
use std::path::PathBuf;

/// pipetask - pipeline agent tasks
#[derive(Parser, Debug)]
#[command(name = "pipetask")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Directory holding runtime.yaml (default: ~/.pipetask)
    #[arg(long, global = true, env = "PIPETASK_CONFIG_DIR")]
    pub config_dir: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Select a Python version from the tool cache, downloading it if needed
    UsePythonVersion(UsePythonVersionArgs),

    /// Build with Maven and report diagnostics
    Maven(MavenArgs),

    /// Run a list of tests with one or more test frameworks
    TestInvoker(TestInvokerArgs),
}

#[derive(Args, Debug)]
pub struct UsePythonVersionArgs {
    /// Version spec, e.g. `3.11`, `>=3.9`, `3.x` or `pypy3`
    #[arg(long, env = "INPUT_VERSIONSPEC")]
    pub version_spec: String,

    /// Interpreter architecture
    #[arg(long, env = "INPUT_ARCHITECTURE", default_value = "x64")]
    pub architecture: Arch,

    /// Prepend the interpreter to PATH
    #[arg(
        long,
        env = "INPUT_ADDTOPATH",
        default_value_t = true,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
    )]
    pub add_to_path: bool,

    /// Accept prerelease versions
    #[arg(
        long,
        env = "INPUT_ALLOWUNSTABLE",
        default_value_t = false,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
    )]
    pub allow_unstable: bool,

    /// Only look in the local tool cache
    #[arg(
        long,
        env = "INPUT_DISABLEDOWNLOADFROMREGISTRY",
        default_value_t = false,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
    )]
    pub disable_download_from_registry: bool,

    /// Token for the version manifest host
    #[arg(long, env = "INPUT_GITHUBTOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Version manifest URL
    #[arg(long)]
    pub manifest_url: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
#[value(rename_all = "PascalCase")]
pub enum MavenVersionSelection {
    Default,
    Path,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
#[value(rename_all = "lower")]
pub enum SonarPluginChoice {
    Latest,
    Pom,
}

#[derive(Args, Debug)]
pub struct MavenArgs {
    /// POM file, relative to the working directory
    #[arg(long, env = "INPUT_MAVENPOMFILE", default_value = "pom.xml")]
    pub maven_pom_file: PathBuf,

    /// Space separated goals
    #[arg(long, env = "INPUT_GOALS", default_value = "package")]
    pub goals: String,

    /// Extra Maven command line
    #[arg(long, env = "INPUT_OPTIONS", allow_hyphen_values = true)]
    pub options: Option<String>,

    /// Exported as MAVEN_OPTS
    #[arg(long, env = "INPUT_MAVENOPTS", allow_hyphen_values = true)]
    pub maven_opts: Option<String>,

    #[arg(
        long,
        env = "INPUT_MAVENVERSIONSELECTION",
        value_enum,
        ignore_case = true,
        default_value = "Default",
    )]
    pub maven_version_selection: MavenVersionSelection,

    /// Maven home, used with `--maven-version-selection Path`
    #[arg(long, env = "INPUT_MAVENPATH")]
    pub maven_path: Option<PathBuf>,

    /// Publish the Maven home as M2_HOME
    #[arg(
        long,
        env = "INPUT_MAVENSETM2HOME",
        default_value_t = false,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
    )]
    pub maven_set_m2_home: bool,

    /// JDK to publish as JAVA_HOME
    #[arg(long, env = "INPUT_JDKUSERINPUTPATH")]
    pub jdk_user_input_path: Option<PathBuf>,

    #[arg(
        long,
        env = "INPUT_PUBLISHJUNITRESULTS",
        default_value_t = true,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
    )]
    pub publish_junit_results: bool,

    /// Test result files, a path or a glob pattern
    #[arg(long, env = "INPUT_TESTRESULTSFILES", default_value = "**/surefire-reports/TEST-*.xml")]
    pub test_results_files: String,

    #[arg(long, env = "INPUT_TESTRUNTITLE")]
    pub test_run_title: Option<String>,

    /// Run SonarQube analysis
    #[arg(
        long,
        env = "INPUT_SQANALYSISENABLED",
        default_value_t = false,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
    )]
    pub sq_analysis_enabled: bool,

    #[arg(
        long,
        env = "INPUT_SQMAVENPLUGINVERSIONCHOICE",
        value_enum,
        ignore_case = true,
        default_value = "latest",
    )]
    pub sq_maven_plugin_version_choice: SonarPluginChoice,

    /// Run SpotBugs analysis
    #[arg(
        long,
        env = "INPUT_SPOTBUGSANALYSISENABLED",
        default_value_t = false,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
    )]
    pub spot_bugs_analysis_enabled: bool,

    /// SpotBugs goal, run as `spotbugs:<goal>`
    #[arg(long, env = "INPUT_SPOTBUGSGOAL", default_value = "spotbugs")]
    pub spot_bugs_goal: String,

    /// Report SpotBugs findings as errors
    #[arg(
        long,
        env = "INPUT_SPOTBUGSFAILWHENBUGSFOUND",
        default_value_t = false,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
    )]
    pub spot_bugs_fail_when_bugs_found: bool,
}

#[derive(Args, Debug)]
pub struct TestInvokerArgs {
    /// Comma separated frameworks: Java-Maven, Java-Gradle, Python
    #[arg(long, env = "INPUT_TESTLANGUAGEINPUT", value_delimiter = ',', required = true)]
    pub test_language_input: Vec<String>,

    /// Comma separated tests to run
    #[arg(long, env = "INPUT_TESTS", value_delimiter = ',', required = true)]
    pub tests: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("pipetask").chain(args.iter().copied())).unwrap()
    }

    #[test]
    #[serial]
    fn test_use_python_version_flags() {
        let cli = parse(&[
            "use-python-version",
            "--version-spec",
            "3.11",
            "--architecture",
            "arm64",
            "--add-to-path",
            "False",
        ]);
        let Commands::UsePythonVersion(args) = cli.command else {
            panic!("expected use-python-version");
        };
        assert_eq!(args.version_spec, "3.11");
        assert_eq!(args.architecture, Arch::Arm64);
        assert!(!args.add_to_path);
        assert!(!args.allow_unstable);
        assert!(args.github_token.is_none());
    }

    #[test]
    #[serial]
    fn test_inputs_read_from_environment() {
        std::env::set_var("INPUT_VERSIONSPEC", "pypy3");
        std::env::set_var("INPUT_ALLOWUNSTABLE", "true");
        let cli = parse(&["use-python-version"]);
        std::env::remove_var("INPUT_VERSIONSPEC");
        std::env::remove_var("INPUT_ALLOWUNSTABLE");

        let Commands::UsePythonVersion(args) = cli.command else {
            panic!("expected use-python-version");
        };
        assert_eq!(args.version_spec, "pypy3");
        assert!(args.allow_unstable);
        assert_eq!(args.architecture, Arch::X64);
    }

    #[test]
    #[serial]
    fn test_maven_defaults() {
        let cli = parse(&["maven", "--options", "-DskipTests -B"]);
        let Commands::Maven(args) = cli.command else {
            panic!("expected maven");
        };
        assert_eq!(args.maven_pom_file, PathBuf::from("pom.xml"));
        assert_eq!(args.goals, "package");
        assert_eq!(args.options.as_deref(), Some("-DskipTests -B"));
        assert_eq!(args.maven_version_selection, MavenVersionSelection::Default);
        assert!(args.publish_junit_results);
        assert_eq!(args.sq_maven_plugin_version_choice, SonarPluginChoice::Latest);
    }

    #[test]
    #[serial]
    fn test_test_invoker_lists() {
        let cli = parse(&[
            "test-invoker",
            "--test-language-input",
            "Java-Maven,Python",
            "--tests",
            "AppTest,DbTest",
        ]);
        let Commands::TestInvoker(args) = cli.command else {
            panic!("expected test-invoker");
        };
        assert_eq!(args.test_language_input, vec!["Java-Maven", "Python"]);
        assert_eq!(args.tests, vec!["AppTest", "DbTest"]);
    }
}
