//! Friendlier labels for folders whose names are opaque, such as simulator
//! device UUIDs.

use std::path::Path;

pub trait DisplayNames: Send + Sync {
    /// A label for `path`, or `default` when nothing better is known.
    fn resolve(&self, path: &Path, default: &str) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PlainNames;

impl DisplayNames for PlainNames {
    fn resolve(&self, _path: &Path, default: &str) -> String {
        default.to_string()
    }
}

/// Names CoreSimulator device folders from their `device.plist`, e.g.
/// `iPhone 15 Pro (iOS 17.0)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatorNames;

const DEVICES_DIR: &str = "CoreSimulator/Devices/";

impl DisplayNames for SimulatorNames {
    fn resolve(&self, path: &Path, default: &str) -> String {
        if !path.to_string_lossy().contains(DEVICES_DIR) {
            return default.to_string();
        }
        std::fs::read_to_string(path.join("device.plist"))
            .ok()
            .and_then(|plist| simulator_label(&plist))
            .unwrap_or_else(|| default.to_string())
    }
}

pub fn for_host() -> Box<dyn DisplayNames> {
    if cfg!(target_os = "macos") {
        Box::new(SimulatorNames)
    } else {
        Box::new(PlainNames)
    }
}

/// Label from the contents of a simulator `device.plist`.
pub fn simulator_label(plist: &str) -> Option<String> {
    let name = plist_string(plist, "name")?;
    match plist_string(plist, "runtime").and_then(|r| parse_runtime(&r)) {
        Some((platform, version)) => Some(format!("{name} ({platform} {version})")),
        None => Some(name),
    }
}

/// The `<string>` that follows `<key>key</key>`.
fn plist_string(plist: &str, key: &str) -> Option<String> {
    let marker = format!("<key>{key}</key>");
    let after = &plist[plist.find(&marker)? + marker.len()..];
    let start = after.find("<string>")? + "<string>".len();
    let end = start + after[start..].find("</string>")?;
    let value = after[start..end].trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// `com.apple.CoreSimulator.SimRuntime.iOS-17-0` -> `("iOS", "17.0")`.
fn parse_runtime(runtime: &str) -> Option<(String, String)> {
    let id = runtime.rsplit_once("SimRuntime.")?.1;
    let mut parts = id.split('-');
    let platform = parts.next()?;
    let major = parts.next()?;
    let minor = parts.next()?;
    if platform.is_empty()
        || !major.chars().all(|c| c.is_ascii_digit())
        || !minor.chars().all(|c| c.is_ascii_digit())
        || major.is_empty()
        || minor.is_empty()
    {
        return None;
    }

    let platform = match platform {
        "xrOS" => "visionOS",
        other => other,
    };
    Some((platform.to_string(), format!("{major}.{minor}")))
}
