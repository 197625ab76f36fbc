use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// One downloadable tool in the catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct Tool {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_category() -> String {
    "Uncategorized".to_string()
}

/// The set of tools the CLI can fetch by name.
///
/// Starts from the built-in list and can be extended from TOML files with
/// `[[tools]]` entries; a file entry with the same name as an existing
/// tool replaces it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub tools: Vec<Tool>,
}

struct BuiltinTool {
    name: &'static str,
    url: &'static str,
    description: &'static str,
    category: &'static str,
}

// Download sources as published by the tool vendors. Names are the
// command line lookup key.
const BUILTIN_TOOLS: &[BuiltinTool] = &[
    BuiltinTool {
        name: "System Informer",
        url: "https://github.com/winsiderss/si-builds/releases/download/3.2.25093.1138/systeminformer-3.2.25093.1138-canary-setup.exe",
        description: "Advanced system monitoring and process analysis tool",
        category: "System Analysis",
    },
    BuiltinTool {
        name: "Bam Parser",
        url: "https://github.com/spokwn/BAM-parser/releases/download/v1.2.7/BAMParser.exe",
        description: "Background Activity Moderator parser for Windows 10/11",
        category: "System Analysis",
    },
    BuiltinTool {
        name: "Paths Parser",
        url: "https://github.com/spokwn/PathsParser/releases/download/v1.0.11/PathsParser.exe",
        description: "Windows Paths registry parser for forensic analysis",
        category: "System Analysis",
    },
    BuiltinTool {
        name: "WinPrefetchView",
        url: "https://www.nirsoft.net/utils/winprefetchview-x64.zip",
        description: "View and analyze Windows Prefetch files",
        category: "System Analysis",
    },
    BuiltinTool {
        name: "USBDeview",
        url: "https://www.nirsoft.net/utils/usbdeview.zip",
        description: "View all USB devices that were connected to your computer",
        category: "System Analysis",
    },
    BuiltinTool {
        name: "WinDefLogs",
        url: "https://www.nirsoft.net/utils/windeflogview.zip",
        description: "View Windows Defender logs and quarantine information",
        category: "Security",
    },
    BuiltinTool {
        name: "WinDefThreads",
        url: "https://www.nirsoft.net/utils/windefthreadsview.zip",
        description: "Monitor Windows Defender threads and processes",
        category: "Security",
    },
    BuiltinTool {
        name: "Everything Tool",
        url: "https://www.voidtools.com/Everything-1.4.1.1026.x64-Setup.exe",
        description: "Lightning-fast file search utility",
        category: "File Tools",
    },
    BuiltinTool {
        name: "Browser Downloads View",
        url: "https://www.nirsoft.net/utils/browserdownloadsview.zip",
        description: "View downloads from various web browsers",
        category: "File Tools",
    },
    BuiltinTool {
        name: "Previous File Recovery",
        url: "https://www.majorgeeks.com/mg/get/previousfilesrecovery,2.html",
        description: "Recover previous versions of files",
        category: "File Recovery",
    },
    BuiltinTool {
        name: "Disk Drill",
        url: "https://www.cleverfiles.com/disk-drill-windows.html",
        description: "Professional data recovery software for Windows",
        category: "File Recovery",
    },
    BuiltinTool {
        name: "Disk Investigator",
        url: "https://www.majorgeeks.com/mg/getmirror/disk_investigator,2.html",
        description: "Investigate disk usage and file allocation",
        category: "Disk Tools",
    },
    BuiltinTool {
        name: "Hayabusa",
        url: "https://github.com/Yamato-Security/hayabusa/releases/download/v3.1.1/hayabusa-3.1.1-win-x64.zip",
        description: "Fast Windows event log analyzer for blue team",
        category: "Forensics",
    },
    BuiltinTool {
        name: "Journal Trace",
        url: "https://github.com/spokwn/JournalTrace/releases/download/1.2/JournalTrace.exe",
        description: "Windows Journal trace parser for forensic analysis",
        category: "Forensics",
    },
    BuiltinTool {
        name: "App Compact Cache Parser",
        url: "https://download.ericzimmermanstools.com/net6/AppCompatCacheParser.zip",
        description: "Parse Windows Application Compatibility Cache",
        category: "Forensics",
    },
    BuiltinTool {
        name: "PECMD",
        url: "https://f001.backblazeb2.com/file/EricZimmermanTools/PECmd.zip",
        description: "Parse Windows Prefetch files",
        category: "Forensics",
    },
    BuiltinTool {
        name: "Last Activity",
        url: "https://www.nirsoft.net/utils/lastactivityview.zip",
        description: "View last activity on your computer",
        category: "Forensics",
    },
    BuiltinTool {
        name: "Timeline Explorer",
        url: "https://download.ericzimmermanstools.com/net6/TimelineExplorer.zip",
        description: "Timeline analysis tool for forensic investigations",
        category: "Forensics",
    },
    BuiltinTool {
        name: "Prefetch Parser",
        url: "https://github.com/spokwn/prefetch-parser/releases/download/v1.5.4/PrefetchParser.exe",
        description: "Advanced Windows Prefetch file parser",
        category: "Forensics",
    },
    BuiltinTool {
        name: "MFTECmd",
        url: "https://download.ericzimmermanstools.com/MFTECmd.zip",
        description: "Master File Table parser for NTFS analysis",
        category: "Forensics",
    },
    BuiltinTool {
        name: "AmcacheParser",
        url: "https://download.ericzimmermanstools.com/AmcacheParser.zip",
        description: "Parse Windows AmCache.hve registry file",
        category: "Forensics",
    },
    BuiltinTool {
        name: "SrumECmd",
        url: "https://download.ericzimmermanstools.com/net9/SrumECmd.zip",
        description: "Parse the Windows SRUM resource usage database",
        category: "Forensics",
    },
    BuiltinTool {
        name: "FTK Imager",
        url: "https://archive.org/download/access-data-ftk-imager-4.7.1/AccessData_FTK_Imager_4.7.1.exe",
        description: "Forensic toolkit for disk imaging and analysis",
        category: "Forensics",
    },
    BuiltinTool {
        name: "OSForensics",
        url: "https://osforensics.com/downloads/OSForensics.exe",
        description: "Comprehensive digital forensics suite",
        category: "Forensics",
    },
    BuiltinTool {
        name: "Autopsy",
        url: "https://github.com/sleuthkit/autopsy/releases/download/autopsy-4.22.1/autopsy-4.22.1-64bit.msi",
        description: "Open source digital forensics platform",
        category: "Forensics",
    },
    BuiltinTool {
        name: "HxD",
        url: "https://mh-nexus.de/en/downloads.php?product=HxD20",
        description: "Professional hex editor and disk editor",
        category: "Hex Tools",
    },
    BuiltinTool {
        name: "Hasher",
        url: "https://download.ericzimmermanstools.com/hasher.zip",
        description: "Calculate file hashes (MD5, SHA1, SHA256)",
        category: "Hex Tools",
    },
    BuiltinTool {
        name: "Bstrings",
        url: "https://download.ericzimmermanstools.com/bstrings.zip",
        description: "Extract strings from binary files",
        category: "Hex Tools",
    },
    BuiltinTool {
        name: "Magnet Process Capture",
        url: "https://go.magnetforensics.com/e/52162/MagnetProcessCapture/kpt99v/1596068034/h/W_fAl_pThcDb-QN7ecFXAw8szOQU2dFtF_t_N383OvM",
        description: "Capture and analyze running processes",
        category: "Process Analysis",
    },
    BuiltinTool {
        name: "Minecraft Tool",
        url: "https://mega.nz/file/ICVwRTIa#41vMenW5HRwSUotNSy_5VH-QRUfT_g4RBEeMwwAfW0c",
        description: "Minecraft analysis tool",
        category: "Specialized",
    },
];

impl Catalog {
    /// The catalog shipped with the binary.
    pub fn builtin() -> Self {
        Catalog {
            tools: BUILTIN_TOOLS
                .iter()
                .map(|tool| Tool {
                    name: tool.name.to_string(),
                    url: tool.url.to_string(),
                    description: tool.description.to_string(),
                    category: tool.category.to_string(),
                })
                .collect(),
        }
    }

    /// Parse a TOML catalog file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read catalog file: {:?}", path))?;
        let catalog: Catalog = toml::from_str(&content)
            .context(format!("Failed to parse catalog file: {:?}", path))?;
        Ok(catalog)
    }

    /// Fold another catalog into this one. Same-named entries replace the
    /// existing tool; everything else is appended.
    pub fn merge(&mut self, extra: Catalog) {
        for tool in extra.tools {
            match self
                .tools
                .iter_mut()
                .find(|existing| existing.name.eq_ignore_ascii_case(&tool.name))
            {
                Some(existing) => *existing = tool,
                None => self.tools.push(tool),
            }
        }
    }

    /// Look a tool up by name, case-insensitively.
    pub fn find(&self, name: &str) -> Option<&Tool> {
        self.tools
            .iter()
            .find(|tool| tool.name.eq_ignore_ascii_case(name))
    }

    /// Iterate tools, optionally restricted to one category.
    pub fn in_category<'a>(&'a self, category: Option<&'a str>) -> impl Iterator<Item = &'a Tool> {
        self.tools.iter().filter(move |tool| {
            category.map_or(true, |wanted| tool.category.eq_ignore_ascii_case(wanted))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_is_well_formed() {
        let catalog = Catalog::builtin();
        assert!(!catalog.tools.is_empty());

        for tool in &catalog.tools {
            assert!(
                tool.url.starts_with("https://") || tool.url.starts_with("http://"),
                "{} has a non-http url",
                tool.name
            );
            assert!(!tool.category.is_empty());
        }

        // Names are the lookup key, so duplicates would shadow each other.
        for (i, tool) in catalog.tools.iter().enumerate() {
            assert!(
                !catalog.tools[i + 1..]
                    .iter()
                    .any(|other| other.name.eq_ignore_ascii_case(&tool.name)),
                "duplicate tool name: {}",
                tool.name
            );
        }
    }

    #[test]
    fn find_is_case_insensitive() {
        let catalog = Catalog::builtin();
        let tool = catalog.find("mftecmd").expect("MFTECmd should exist");
        assert_eq!(tool.name, "MFTECmd");
        assert!(catalog.find("no such tool").is_none());
    }

    #[test]
    fn builtin_covers_every_category() {
        let catalog = Catalog::builtin();
        let mut categories: Vec<&str> = catalog
            .tools
            .iter()
            .map(|tool| tool.category.as_str())
            .collect();
        categories.sort_unstable();
        categories.dedup();
        assert_eq!(
            categories,
            [
                "Disk Tools",
                "File Recovery",
                "File Tools",
                "Forensics",
                "Hex Tools",
                "Process Analysis",
                "Security",
                "Specialized",
                "System Analysis",
            ]
        );

        // Single-entry categories are the easiest to lose by accident.
        assert!(catalog.find("Previous File Recovery").is_some());
        assert!(catalog.find("Disk Investigator").is_some());
        assert!(catalog.find("HxD").is_some());
        assert!(catalog.find("Magnet Process Capture").is_some());
        assert!(catalog.find("Minecraft Tool").is_some());
        assert!(catalog.find("Disk Drill").is_some());
    }

    #[test]
    fn category_filter_matches_case_insensitively() {
        let catalog = Catalog::builtin();
        let forensics: Vec<_> = catalog.in_category(Some("forensics")).collect();
        assert!(!forensics.is_empty());
        assert!(forensics.iter().all(|t| t.category == "Forensics"));

        let all: Vec<_> = catalog.in_category(None).collect();
        assert_eq!(all.len(), catalog.tools.len());
    }

    #[test]
    fn parses_toml_tools() {
        let toml_text = r#"
[[tools]]
name = "Example"
url = "https://example.com/example.zip"
description = "An example"
category = "Testing"

[[tools]]
name = "Bare"
url = "https://example.com/bare.exe"
"#;
        let catalog: Catalog = toml::from_str(toml_text).unwrap();
        assert_eq!(catalog.tools.len(), 2);
        assert_eq!(catalog.tools[0].category, "Testing");
        assert_eq!(catalog.tools[1].description, "");
        assert_eq!(catalog.tools[1].category, "Uncategorized");
    }

    #[test]
    fn merge_overrides_by_name_and_appends_the_rest() {
        let mut catalog = Catalog::builtin();
        let before = catalog.tools.len();

        let extra: Catalog = toml::from_str(
            r#"
[[tools]]
name = "mftecmd"
url = "https://mirror.example.com/MFTECmd.zip"
description = "Mirrored build"
category = "Forensics"

[[tools]]
name = "New Tool"
url = "https://example.com/new.zip"
category = "Testing"
"#,
        )
        .unwrap();

        catalog.merge(extra);
        assert_eq!(catalog.tools.len(), before + 1);

        let replaced = catalog.find("MFTECmd").unwrap();
        assert_eq!(replaced.url, "https://mirror.example.com/MFTECmd.zip");
        assert!(catalog.find("New Tool").is_some());
    }
}
