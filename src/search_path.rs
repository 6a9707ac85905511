//! Built-in script search directories.

use crate::env::Environment;
use crate::layout::InstallLayout;
use log::debug;

/// Installation root: `exe_dir` without the configured binary directory.
///
/// Left unchanged when `bindir` is not a suffix of `exe_dir`; an empty
/// `bindir` strips nothing.
pub fn run_prefix<'a>(exe_dir: &'a str, bindir: &str) -> &'a str {
    exe_dir.strip_suffix(bindir).unwrap_or(exe_dir)
}

/// Default script search directories, highest priority first.
///
/// User override locations come before the scripts shipped with the tool, so
/// a site can shadow any of them. Variables missing from `env` skip their
/// entry.
pub fn build_default_search_dirs(
    layout: &InstallLayout,
    env: &Environment,
    exe_dir: &str,
) -> Vec<String> {
    let prefix = run_prefix(exe_dir, &layout.bindir);
    debug!("bindir={}", layout.bindir);
    debug!("pkgdatadir={}", layout.pkgdatadir);
    debug!("run_prefix={}", prefix);

    let mut dirs = Vec::new();

    if let Some(home) = env.get_var("HOME") {
        dirs.push(format!("{}/.{}", home, layout.tool_name));
    }

    if let Some(extra) = env.get_var(&layout.scripts_env) {
        dirs.push(extra);
    }

    if let Some(folder) = &layout.app_data_dir {
        if let Some(appdata) = env.get_var("APPDATA") {
            dirs.push(format!("{}/{}", appdata, folder));
        }
    }

    dirs.push(format!("{}{}/site", prefix, layout.pkgdatadir));
    dirs.push(format!("{}{}/scripts", prefix, layout.pkgdatadir));
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn layout() -> InstallLayout {
        InstallLayout {
            bindir: "/bin".to_string(),
            pkgdatadir: "/share/openocd".to_string(),
            tool_name: "openocd".to_string(),
            scripts_env: "OPENOCD_SCRIPTS".to_string(),
            app_data_dir: Some("OpenOCD".to_string()),
        }
    }

    fn env(vars: &[(&str, &str)]) -> Environment {
        Environment::with_vars(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        )
    }

    #[test]
    fn test_run_prefix_strips_bindir_suffix() {
        assert_eq!(run_prefix("/opt/ocd/bin", "/bin"), "/opt/ocd");
    }

    #[test]
    fn test_run_prefix_keeps_dir_without_suffix() {
        assert_eq!(run_prefix("/opt/ocd/tools", "/bin"), "/opt/ocd/tools");
    }

    #[test]
    fn test_run_prefix_with_empty_bindir() {
        assert_eq!(run_prefix("/opt/ocd/bin", ""), "/opt/ocd/bin");
    }

    #[test]
    fn test_run_prefix_whole_dir_is_bindir() {
        assert_eq!(run_prefix("/usr/local/bin", "/usr/local/bin"), "");
    }

    #[test]
    fn test_all_sources_present_in_fixed_order() {
        let env = env(&[
            ("HOME", "/home/dev"),
            ("OPENOCD_SCRIPTS", "/srv/ocd-scripts"),
            ("APPDATA", "C:/Users/dev/AppData/Roaming"),
        ]);

        let dirs = build_default_search_dirs(&layout(), &env, "/opt/ocd/bin");

        assert_eq!(
            dirs,
            vec![
                "/home/dev/.openocd",
                "/srv/ocd-scripts",
                "C:/Users/dev/AppData/Roaming/OpenOCD",
                "/opt/ocd/share/openocd/site",
                "/opt/ocd/share/openocd/scripts",
            ]
        );
    }

    #[test]
    fn test_missing_variables_are_skipped() {
        let dirs = build_default_search_dirs(&layout(), &env(&[]), "/opt/ocd/bin");
        assert_eq!(
            dirs,
            vec![
                "/opt/ocd/share/openocd/site",
                "/opt/ocd/share/openocd/scripts",
            ]
        );
    }

    #[test]
    fn test_appdata_ignored_without_app_data_folder() {
        let layout = InstallLayout {
            app_data_dir: None,
            ..layout()
        };
        let env = env(&[("APPDATA", "C:/Roaming")]);
        let dirs = build_default_search_dirs(&layout, &env, "/x/bin");
        assert!(dirs.iter().all(|d| !d.starts_with("C:/Roaming")));
    }

    #[test]
    fn test_absolute_bindir_layout() {
        let layout = InstallLayout {
            bindir: "/usr/local/bin".to_string(),
            pkgdatadir: "/usr/local/share/openocd".to_string(),
            app_data_dir: None,
            ..layout()
        };
        let dirs = build_default_search_dirs(&layout, &env(&[]), "/usr/local/bin");
        assert_eq!(
            dirs,
            vec![
                "/usr/local/share/openocd/site",
                "/usr/local/share/openocd/scripts",
            ]
        );
    }

    #[test]
    fn test_repeated_builds_are_identical() {
        let env = env(&[("HOME", "/home/dev")]);
        let first = build_default_search_dirs(&layout(), &env, "/opt/ocd/bin");
        let second = build_default_search_dirs(&layout(), &env, "/opt/ocd/bin");
        assert_eq!(first, second);
    }
}
