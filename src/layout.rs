//! Installation layout compiled into the binary.
//!
//! Packagers override the directories at build time through the
//! `OPENOCD_BINDIR` and `OPENOCD_PKGDATADIR` environment variables, or
//! select the [portable](InstallLayout::portable) layout by setting
//! `OPENOCD_PORTABLE`.

/// Binary directory used when the build does not configure one.
pub const DEFAULT_BINDIR: &str = "/usr/local/bin";
/// Package data directory used when the build does not configure one.
pub const DEFAULT_PKGDATADIR: &str = "/usr/local/share/openocd";

/// Where the tool expects to be installed, and how it names itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    /// Configured binary directory; stripped from the executable directory
    /// to find the run prefix.
    pub bindir: String,
    /// Configured package data directory, appended to the run prefix.
    pub pkgdatadir: String,
    /// Lower-case tool name, used for `~/.<name>` and the pipe log file.
    pub tool_name: String,
    /// Variable holding an extra script directory.
    pub scripts_env: String,
    /// Folder under `APPDATA`; only set on platforms that have one.
    pub app_data_dir: Option<String>,
}

impl Default for InstallLayout {
    fn default() -> Self {
        if option_env!("OPENOCD_PORTABLE").is_some() {
            return Self::portable();
        }
        Self {
            bindir: option_env!("OPENOCD_BINDIR")
                .unwrap_or(DEFAULT_BINDIR)
                .to_string(),
            pkgdatadir: option_env!("OPENOCD_PKGDATADIR")
                .unwrap_or(DEFAULT_PKGDATADIR)
                .to_string(),
            tool_name: "openocd".to_string(),
            scripts_env: "OPENOCD_SCRIPTS".to_string(),
            app_data_dir: cfg!(windows).then(|| "OpenOCD".to_string()),
        }
    }
}

impl InstallLayout {
    /// Self-contained install where `site` and `scripts` sit next to the
    /// `bin` directory holding the executable, e.g. an unpacked archive on
    /// Windows.
    pub fn portable() -> Self {
        Self {
            bindir: "/bin".to_string(),
            pkgdatadir: String::new(),
            tool_name: "openocd".to_string(),
            scripts_env: "OPENOCD_SCRIPTS".to_string(),
            app_data_dir: cfg!(windows).then(|| "OpenOCD".to_string()),
        }
    }

    /// File the legacy pipe mode redirects logging to.
    pub fn pipe_log_file(&self) -> String {
        format!("{}.log", self.tool_name)
    }
}
