//! Regional variant tags carried in mod file names.
//!
//! A mod file named `model+eu_fr.bin` replaces the `eu_fr` variant of the
//! logical entry `model.bin`. The tag set is closed and its order defines the
//! numeric region index used by the container (1-based, `0` meaning "none").

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Locale-specific variant of a logical archive entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    JpJa,
    UsEn,
    UsFr,
    UsEs,
    EuEn,
    EuFr,
    EuEs,
    EuDe,
    EuNl,
    EuIt,
    EuRu,
    KrKo,
    ZhCn,
    ZhTw,
}

impl Region {
    /// All regions in lookup priority order.
    pub const ALL: [Region; 14] = [
        Region::JpJa,
        Region::UsEn,
        Region::UsFr,
        Region::UsEs,
        Region::EuEn,
        Region::EuFr,
        Region::EuEs,
        Region::EuDe,
        Region::EuNl,
        Region::EuIt,
        Region::EuRu,
        Region::KrKo,
        Region::ZhCn,
        Region::ZhTw,
    ];

    /// The tag as it appears after `+` in a file name.
    pub fn tag(self) -> &'static str {
        match self {
            Region::JpJa => "jp_ja",
            Region::UsEn => "us_en",
            Region::UsFr => "us_fr",
            Region::UsEs => "us_es",
            Region::EuEn => "eu_en",
            Region::EuFr => "eu_fr",
            Region::EuEs => "eu_es",
            Region::EuDe => "eu_de",
            Region::EuNl => "eu_nl",
            Region::EuIt => "eu_it",
            Region::EuRu => "eu_ru",
            Region::KrKo => "kr_ko",
            Region::ZhCn => "zh_cn",
            Region::ZhTw => "zh_tw",
        }
    }

    /// 1-based region index in the container's region table.
    pub fn index(self) -> u32 {
        Region::ALL
            .iter()
            .position(|r| *r == self)
            .map(|i| i as u32 + 1)
            .unwrap_or(0)
    }

    /// Look a region up by its 1-based index.
    pub fn from_index(index: u32) -> Option<Region> {
        index
            .checked_sub(1)
            .and_then(|i| Region::ALL.get(i as usize).copied())
    }

    /// Match a tag exactly (`"eu_fr"`, not `"+eu_fr"`).
    pub fn from_tag(tag: &str) -> Option<Region> {
        Region::ALL.iter().copied().find(|r| r.tag() == tag)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Region::from_tag(s).ok_or_else(|| format!("unknown region tag '{}'", s))
    }
}

/// Split a region tag off a file name.
///
/// The name is split into stem and extension at the last `.`; when the stem's
/// last `+`-delimited segment is a known tag, it is removed and returned.
/// Unknown tags leave the name untouched.
///
/// - `model+eu_fr.bin` -> (`model.bin`, `Some(EuFr)`)
/// - `model.bin` -> (`model.bin`, `None`)
/// - `model+v2.bin` -> (`model+v2.bin`, `None`)
pub fn split_region_tag(file_name: &str) -> (String, Option<Region>) {
    let (stem, ext) = match file_name.rfind('.') {
        Some(idx) if idx > 0 => file_name.split_at(idx),
        _ => (file_name, ""),
    };

    if let Some(plus) = stem.rfind('+') {
        if let Some(region) = Region::from_tag(&stem[plus + 1..]) {
            return (format!("{}{}", &stem[..plus], ext), Some(region));
        }
    }

    (file_name.to_string(), None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_region_tag() {
        let (name, region) = split_region_tag("model+eu_fr.bin");
        assert_eq!(name, "model.bin");
        assert_eq!(region, Some(Region::EuFr));
        assert_eq!(region.unwrap().index(), 6);
    }

    #[test]
    fn test_no_region_tag() {
        let (name, region) = split_region_tag("model.bin");
        assert_eq!(name, "model.bin");
        assert_eq!(region, None);
    }

    #[test]
    fn test_unknown_tag_kept() {
        let (name, region) = split_region_tag("model+v2.bin");
        assert_eq!(name, "model+v2.bin");
        assert_eq!(region, None);
    }

    #[test]
    fn test_only_last_segment_matters() {
        let (name, region) = split_region_tag("ui+jp_ja+zh_tw.arc");
        assert_eq!(name, "ui+jp_ja.arc");
        assert_eq!(region, Some(Region::ZhTw));
    }

    #[test]
    fn test_no_extension() {
        let (name, region) = split_region_tag("voice+us_en");
        assert_eq!(name, "voice");
        assert_eq!(region, Some(Region::UsEn));
    }

    #[test]
    fn test_multi_dot_name() {
        let (name, region) = split_region_tag("stage.nutexb+kr_ko.bak");
        assert_eq!(name, "stage.nutexb.bak");
        assert_eq!(region, Some(Region::KrKo));

        let (name, region) = split_region_tag("stage+kr_ko.tar.gz");
        assert_eq!(name, "stage+kr_ko.tar.gz");
        assert_eq!(region, None);
    }

    #[test]
    fn test_index_round_trip_bounds() {
        assert_eq!(Region::JpJa.index(), 1);
        assert_eq!(Region::ZhTw.index(), 14);
        assert_eq!(Region::from_index(0), None);
        assert_eq!(Region::from_index(15), None);
        assert_eq!(Region::from_index(6), Some(Region::EuFr));
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("eu_de".parse::<Region>().unwrap(), Region::EuDe);
        assert!("+eu_de".parse::<Region>().is_err());
        assert_eq!(Region::KrKo.to_string(), "kr_ko");
    }
}
