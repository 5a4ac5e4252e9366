//! # Discovered Devices
//!
//! Identity records surfaced during scanning, plus the icon classification
//! used to present them. Classification prefers the reported device-class
//! major value; when class data is unavailable it falls back to name
//! heuristics (printer name prefixes, "tv"/"speaker"/"watch" tokens, etc).

use std::fmt;

/// Icon category for a discovered device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceIcon {
    Computer,
    Phone,
    Headphones,
    Mouse,
    Printer,
    Keyboard,
    Watch,
    Tv,
    Speaker,
    Light,
    Audio,
    /// Generic fallback when nothing better matches.
    Bluetooth,
}

impl fmt::Display for DeviceIcon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Computer => "computer",
            Self::Phone => "phone",
            Self::Headphones => "headphones",
            Self::Mouse => "mouse",
            Self::Printer => "printer",
            Self::Keyboard => "keyboard",
            Self::Watch => "watch",
            Self::Tv => "tv",
            Self::Speaker => "speaker",
            Self::Light => "light",
            Self::Audio => "audio",
            Self::Bluetooth => "bluetooth",
        };
        f.write_str(name)
    }
}

impl DeviceIcon {
    /// Map a Bluetooth class-of-device major value to an icon.
    ///
    /// Major values per the Bluetooth assigned numbers (bits 8-12 of the
    /// class field): 0x100 computer, 0x200 phone, 0x400 audio/video,
    /// 0x500 peripheral, 0x600 imaging, 0x700 wearable, 0x1F00
    /// uncategorized.
    pub fn from_class_major(major: u32) -> Option<Self> {
        match major {
            0x100 => Some(Self::Computer),
            0x200 => Some(Self::Phone),
            0x400 => Some(Self::Headphones),
            0x500 => Some(Self::Mouse),
            0x600 => Some(Self::Printer),
            0x700 => Some(Self::Watch),
            0x1F00 => Some(Self::Audio),
            _ => None,
        }
    }

    /// Classify by name when class data is unavailable.
    ///
    /// Thermal printers commonly advertise names like "PP-58", "MTP-II",
    /// "POS-5805" or "BT-Printer", so those prefixes win first.
    pub fn from_name(name: &str) -> Self {
        let name = name.to_lowercase();

        if name.starts_with("pp")
            || name.starts_with("mtp")
            || name.starts_with("pos")
            || name.starts_with("bt")
        {
            return Self::Printer;
        }

        if name.contains("tv")
            || name.contains("frame")
            || name.contains("[av]")
            || name.contains("qled")
            || name.contains("hdtv")
        {
            return Self::Tv;
        }

        if name.contains("speaker") || name.contains("soundbar") {
            return Self::Speaker;
        }

        if name.contains("light") || name.contains("govee") || name.contains("ihoment") {
            return Self::Light;
        }

        if name.contains("printer") || name.starts_with("wwm") || name.contains("epson") {
            return Self::Printer;
        }

        if name.contains("watch") || name.contains("wear") {
            return Self::Watch;
        }

        if name.contains("headset")
            || name.contains("earbud")
            || name.contains("headphones")
        {
            return Self::Headphones;
        }

        Self::Bluetooth
    }

    /// Full classification: class major first, name heuristic second.
    pub fn classify(class_major: Option<u32>, name: &str) -> Self {
        class_major
            .and_then(Self::from_class_major)
            .unwrap_or_else(|| Self::from_name(name))
    }
}

/// A device surfaced during a scan session.
///
/// `address` is the opaque platform connection handle and the unique key
/// for deduplication within a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    pub name: String,
    pub address: String,
    pub icon: DeviceIcon,
}

impl DiscoveredDevice {
    pub fn new(name: impl Into<String>, address: impl Into<String>, class_major: Option<u32>) -> Self {
        let name = name.into();
        let icon = DeviceIcon::classify(class_major, &name);
        Self {
            name,
            address: address.into(),
            icon,
        }
    }
}
