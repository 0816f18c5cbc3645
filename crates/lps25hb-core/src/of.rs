//! Devicetree match table

/// One entry of an OF match table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfDeviceId {
    /// Devicetree `compatible` string
    pub compatible: &'static str,
}

impl OfDeviceId {
    /// Create a match entry for `compatible`
    pub const fn new(compatible: &'static str) -> Self {
        Self { compatible }
    }
}

/// Match table for the LPS25HB driver
pub const LPS25HB_OF_MATCH: &[OfDeviceId] = &[OfDeviceId::new("mr,lps25hb")];

/// Find the table entry matching a device's compatible list
///
/// The device list is ordered most-specific first, so the first device string
/// present in the table wins.
pub fn of_match_device<'a, S: AsRef<str>>(
    table: &'a [OfDeviceId],
    compatible: &[S],
) -> Option<&'a OfDeviceId> {
    compatible
        .iter()
        .find_map(|c| table.iter().find(|id| id.compatible == c.as_ref()))
}
