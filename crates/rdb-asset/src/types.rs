use rdb_types::AssetId;

/// Type name for IDs missing from the built-in table.
pub const UNKNOWN_TYPE: &str = "unknown";

/// Built-in asset categories, sorted by ID for binary search.
static TYPE_TABLE: &[(u64, &str)] = &[
    (1000007, "physx_xml"),
    (1000010, "file_index"),
    (1000083, "xml_treasure"),
    (1000087, "xml_zone_transition"),
    (1000090, "xml_resurrection"),
    (1000623, "text"),
    (1000624, "flash_image"),
    (1000635, "usm_video"),
    (1000636, "image"),
    (1010008, "misc_image"),
    (1010013, "map"),
    (1010042, "loading_screen"),
    (1010207, "particle_effect"),
    (1010210, "image"),
    (1010211, "image"),
    (1020001, "unknown"),
    (1020002, "sound_effect"),
    (1020003, "dialog_audio"),
    (1020005, "music"),
    (1020006, "sound_tone"),
    (1030002, "string"),
    (1066603, "texture"),
    (1070003, "playfield"),
];

/// Resolve the type name for an asset ID.
///
/// Unknown IDs resolve to [`UNKNOWN_TYPE`].
pub fn resolve_type(id: AssetId) -> &'static str {
    TYPE_TABLE
        .binary_search_by_key(&id.get(), |(k, _)| *k)
        .map(|i| TYPE_TABLE[i].1)
        .unwrap_or(UNKNOWN_TYPE)
}

/// Every `(id, type)` pair in the built-in table, in ID order.
pub fn builtin_types() -> impl Iterator<Item = (AssetId, &'static str)> {
    TYPE_TABLE.iter().map(|(id, ty)| (AssetId(*id), *ty))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_strictly_sorted() {
        assert!(TYPE_TABLE.windows(2).all(|w| w[0].0 < w[1].0));
        assert_eq!(TYPE_TABLE.len(), 23);
    }

    #[test]
    fn resolves_known_ids() {
        assert_eq!(resolve_type(AssetId(1030002)), "string");
        assert_eq!(resolve_type(AssetId(1020005)), "music");
        assert_eq!(resolve_type(AssetId(1000636)), "image");
        assert_eq!(resolve_type(AssetId(1000623)), "text");
    }

    #[test]
    fn unknown_ids_fall_back() {
        assert_eq!(resolve_type(AssetId(42)), UNKNOWN_TYPE);
        assert_eq!(resolve_type(AssetId(u64::MAX)), UNKNOWN_TYPE);
    }

    #[test]
    fn builtin_types_iterates_whole_table() {
        let all: Vec<_> = builtin_types().collect();
        assert_eq!(all.first(), Some(&(AssetId(1000007), "physx_xml")));
        assert_eq!(all.len(), TYPE_TABLE.len());
    }
}
