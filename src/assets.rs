use crate::github::{Asset, Release};

const LEGAL_SUFFIX: &str = ".legal.txt";
const GENERIC_RENDERER: &str = "renderer";

/// Substrings that identify the assets one install target needs.
///
/// Matching is done against the lowercased asset name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformRules {
    /// Installed file that carries the `// Velocity <id>` marker.
    pub entry_point: String,
    pub include: Vec<String>,
}

impl PlatformRules {
    pub fn new<I, S>(entry_point: impl Into<String>, include: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PlatformRules {
            entry_point: entry_point.into(),
            include: include
                .into_iter()
                .map(|s| s.into().to_lowercase())
                .collect(),
        }
    }

    /// Assets injected into the stock Discord client.
    pub fn discord() -> Self {
        PlatformRules::new("patcher.js", ["patcher", "preload", GENERIC_RENDERER])
    }

    /// Assets of the standalone desktop app.
    pub fn desktop() -> Self {
        PlatformRules::new(
            "desktop.asar",
            [
                "desktop.asar",
                "desktopmain",
                "desktoppreload",
                "desktoprenderer",
            ],
        )
    }

    fn matches(&self, name: &str) -> bool {
        self.include.iter().any(|want| {
            if want == GENERIC_RENDERER {
                is_generic_renderer(name)
            } else {
                name.contains(want.as_str())
            }
        })
    }
}

/// Pick the assets of `release` that `rules` asks for, keeping release order.
///
/// Legal notices are never selected. An empty result is not an error here;
/// callers decide how to report it.
pub fn select<'a>(release: &'a Release, rules: &PlatformRules) -> Vec<&'a Asset> {
    release
        .assets
        .iter()
        .filter(|a| {
            let name = a.name.to_lowercase();
            !name.ends_with(LEGAL_SUFFIX) && rules.matches(&name)
        })
        .collect()
}

/// `renderer` only counts when it is not the tail of a prefixed name such as
/// `velocitydesktoprenderer.js`.
fn is_generic_renderer(name: &str) -> bool {
    name.match_indices(GENERIC_RENDERER).any(|(i, _)| {
        name[..i]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric())
    })
}
