//! Fixed catalog of selectable flag textures.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagEntry {
    pub label: &'static str,
    pub file: &'static str,
}

/// Ordered list presented to the user. File names resolve relative to the
/// configured asset base path.
pub const FLAG_CATALOG: &[FlagEntry] = &[
    FlagEntry { label: "México", file: "MexicoFlag.jpg" },
    FlagEntry { label: "España", file: "SpainFlag.jpg" },
    FlagEntry { label: "Uruguay", file: "UruguayFlag.jpg" },
    FlagEntry { label: "Colombia", file: "ColombiaFlag.jpg" },
    FlagEntry { label: "Corea del Sur", file: "SouthKoreaFlag.jpg" },
    FlagEntry { label: "Túnez", file: "TunezFlag.jpg" },
    FlagEntry { label: "Japón", file: "JapanFlag.jpg" },
    FlagEntry { label: "Portugal", file: "PortugalFlag.jpg" },
    FlagEntry { label: "Francia", file: "FranceFlag.jpg" },
    FlagEntry { label: "Argentina", file: "ArgentinaFlag.jpg" },
];

pub fn find_by_file(file: &str) -> Option<&'static FlagEntry> {
    FLAG_CATALOG.iter().find(|entry| entry.file == file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_ten_unique_files() {
        assert_eq!(FLAG_CATALOG.len(), 10);
        for (i, entry) in FLAG_CATALOG.iter().enumerate() {
            assert!(entry.file.ends_with(".jpg"));
            assert!(!entry.label.is_empty());
            assert!(
                FLAG_CATALOG[i + 1..].iter().all(|other| other.file != entry.file),
                "duplicate file {}",
                entry.file
            );
        }
    }

    #[test]
    fn lookup_by_file() {
        assert_eq!(find_by_file("SpainFlag.jpg").unwrap().label, "España");
        assert!(find_by_file("AtlantisFlag.jpg").is_none());
    }
}
