//! Canned build output

pub const MAVEN_VERSION_BANNER: &str =
    "Apache Maven 3.9.6 (bc0240f3c744dd6b6ec2920b3cd08dcc295161ae)";

pub const COMPILER_ERROR_LINE: &str =
    "[ERROR] /work/src/main/java/App.java:[12,5] cannot find symbol";

pub const COMPILER_WARNING_LINE: &str =
    "[WARNING] /work/src/main/java/Util.java:[3,1] unchecked conversion";

pub const SPOTBUGS_MARKER_LINE: &str =
    "[INFO] <<< spotbugs-maven-plugin:4.7.3.0:check (default-cli) < :spotbugs @ app <<<";

pub const SPOTBUGS_SUMMARY_LINE: &str = "[INFO] Total bugs: 2";

pub const SUREFIRE_REPORT: &str = "target/surefire-reports/TEST-com.acme.AppTest.xml";
