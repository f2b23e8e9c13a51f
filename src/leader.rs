//! MARC record leader parsing and manipulation.
//!
//! The MARC leader is a 24-byte fixed-length field at the start of every MARC record.
//! It contains metadata describing the record's structure, content type, and encoding.
//!
//! # Structure
//!
//! - Positions 0-4: Record length (5 digits)
//! - Position 5: Record status
//! - Position 6: Record type (a = language material, c = music, etc.)
//! - Position 7: Bibliographic level (m = monograph, s = serial, etc.)
//! - Position 8: Control record type
//! - Position 9: Character coding (space = MARC-8, a = UTF-8)
//! - Position 10: Indicator count (usually 2)
//! - Position 11: Subfield code count (usually 2)
//! - Positions 12-16: Base address of data (5 digits)
//! - Positions 17-19: Encoding level, cataloging form, multipart level
//! - Positions 20-23: Entry map (usually "4500")

use crate::error::{MarcError, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Length of the leader in bytes.
pub const LEADER_LENGTH: usize = 24;

/// Number of digits of the record length at the start of the leader.
pub const RECORD_LENGTH_FIELD_LENGTH: usize = 5;

/// MARC Leader - 24 bytes at the start of every MARC record.
///
/// All positions hold ASCII characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Leader {
    /// Record length (5 digits) - positions 0-4
    pub record_length: u32,
    /// Record status (1 char) - position 5
    pub record_status: char,
    /// Type of record (1 char) - position 6
    pub record_type: char,
    /// Bibliographic level (1 char) - position 7
    pub bibliographic_level: char,
    /// Type of control record (1 char) - position 8
    pub control_record_type: char,
    /// Character coding scheme (1 char) - position 9
    pub character_coding: char,
    /// Indicator count (1 digit) - position 10 (usually 2)
    pub indicator_count: u8,
    /// Subfield code count (1 digit) - position 11 (usually 2)
    pub subfield_code_count: u8,
    /// Base address of data (5 digits) - positions 12-16
    pub data_base_address: u32,
    /// Encoding level (1 char) - position 17
    pub encoding_level: char,
    /// Cataloging form (1 char) - position 18
    pub cataloging_form: char,
    /// Multipart resource record level (1 char) - position 19
    pub multipart_level: char,
    /// Entry map (4 chars) - positions 20-23
    pub entry_map: [char; 4],
}

/// Type of record, leader position 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum TypeOfRecord {
    LanguageMaterial,
    NotatedMusic,
    ManuscriptNotatedMusic,
    CartographicMaterial,
    ManuscriptCartographicMaterial,
    ProjectedMedium,
    NonmusicalSoundRecording,
    MusicalSoundRecording,
    TwoDimensionalNonprojectableGraphic,
    ComputerFile,
    Kit,
    MixedMaterials,
    ThreeDimensionalArtifact,
    ManuscriptLanguageMaterial,
}

impl TypeOfRecord {
    /// Leader code for this type.
    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Self::LanguageMaterial => 'a',
            Self::NotatedMusic => 'c',
            Self::ManuscriptNotatedMusic => 'd',
            Self::CartographicMaterial => 'e',
            Self::ManuscriptCartographicMaterial => 'f',
            Self::ProjectedMedium => 'g',
            Self::NonmusicalSoundRecording => 'i',
            Self::MusicalSoundRecording => 'j',
            Self::TwoDimensionalNonprojectableGraphic => 'k',
            Self::ComputerFile => 'm',
            Self::Kit => 'o',
            Self::MixedMaterials => 'p',
            Self::ThreeDimensionalArtifact => 'r',
            Self::ManuscriptLanguageMaterial => 't',
        }
    }
}

/// Bibliographic level, leader position 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum BibliographicLevel {
    MonographicComponentPart,
    SerialComponentPart,
    Collection,
    Subunit,
    IntegratingResource,
    MonographOrItem,
    Serial,
}

impl BibliographicLevel {
    /// Leader code for this level.
    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Self::MonographicComponentPart => 'a',
            Self::SerialComponentPart => 'b',
            Self::Collection => 'c',
            Self::Subunit => 'd',
            Self::IntegratingResource => 'i',
            Self::MonographOrItem => 'm',
            Self::Serial => 's',
        }
    }
}

/// Broad record class derived from leader position 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    /// `z`
    Authority,
    /// `w`
    Classification,
    /// One of `acdefgijkmoprt`
    Bibliographic,
    /// Anything else
    Unknown,
}

impl Leader {
    /// Leader for a freshly constructed record.
    #[must_use]
    pub fn for_new_record(type_of_record: TypeOfRecord, level: BibliographicLevel) -> Self {
        Leader {
            record_length: 0,
            record_status: 'n',
            record_type: type_of_record.code(),
            bibliographic_level: level.code(),
            control_record_type: ' ',
            character_coding: 'a',
            indicator_count: 2,
            subfield_code_count: 2,
            data_base_address: 445,
            encoding_level: '2',
            cataloging_form: ' ',
            multipart_level: ' ',
            entry_map: ['4', '5', '0', '0'],
        }
    }

    /// Parse a leader from its first 24 bytes.
    ///
    /// Non-standard indicator count, subfield code length or entry map are
    /// logged as warnings, not rejected.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::MalformedLeader`] if the bytes are too short, not
    /// ASCII, or the numeric positions are not digits.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < LEADER_LENGTH {
            return Err(MarcError::MalformedLeader(format!(
                "Leader must be at least {LEADER_LENGTH} bytes, got {}",
                bytes.len()
            )));
        }
        let bytes = &bytes[..LEADER_LENGTH];
        if !bytes.is_ascii() {
            return Err(MarcError::MalformedLeader(format!(
                "Leader contains non-ASCII bytes: {:?}",
                String::from_utf8_lossy(bytes)
            )));
        }

        let record_length = parse_digits(&bytes[0..5], "record length")?;
        let indicator_count = parse_count(bytes[10], "indicator count")?;
        let subfield_code_count = parse_count(bytes[11], "subfield code count")?;
        let data_base_address = parse_digits(&bytes[12..17], "base address of data")?;

        if indicator_count != 2 {
            warn!(indicator_count, "non-standard indicator count in leader");
        }
        if subfield_code_count != 2 {
            warn!(subfield_code_count, "non-standard subfield code length in leader");
        }
        if &bytes[20..23] != b"450" {
            warn!(entry_map = %String::from_utf8_lossy(&bytes[20..24]), "non-standard entry map in leader");
        }

        Ok(Leader {
            record_length,
            record_status: bytes[5] as char,
            record_type: bytes[6] as char,
            bibliographic_level: bytes[7] as char,
            control_record_type: bytes[8] as char,
            character_coding: bytes[9] as char,
            indicator_count,
            subfield_code_count,
            data_base_address,
            encoding_level: bytes[17] as char,
            cataloging_form: bytes[18] as char,
            multipart_level: bytes[19] as char,
            entry_map: [
                bytes[20] as char,
                bytes[21] as char,
                bytes[22] as char,
                bytes[23] as char,
            ],
        })
    }

    /// Validate that the leader is suitable for binary record reading.
    ///
    /// # Errors
    ///
    /// Returns an error if `record_length` or `data_base_address` is less than 24,
    /// or the base address lies beyond the end of the record.
    pub fn validate_for_reading(&self) -> Result<()> {
        if (self.record_length as usize) < LEADER_LENGTH {
            return Err(MarcError::MalformedLeader(format!(
                "Record length must be at least {LEADER_LENGTH}, got {}",
                self.record_length
            )));
        }
        if (self.data_base_address as usize) < LEADER_LENGTH {
            return Err(MarcError::MalformedLeader(format!(
                "Base address of data must be at least {LEADER_LENGTH}, got {}",
                self.data_base_address
            )));
        }
        if self.data_base_address > self.record_length {
            return Err(MarcError::MalformedLeader(format!(
                "Base address of data {} exceeds record length {}",
                self.data_base_address, self.record_length
            )));
        }
        Ok(())
    }

    /// Serialize the leader to its 24-byte form.
    ///
    /// Lengths are written as the low five decimal digits.
    #[must_use]
    pub fn as_bytes(&self) -> [u8; LEADER_LENGTH] {
        let mut bytes = [b' '; LEADER_LENGTH];
        write_digits(&mut bytes[0..5], self.record_length);
        bytes[5] = self.record_status as u8;
        bytes[6] = self.record_type as u8;
        bytes[7] = self.bibliographic_level as u8;
        bytes[8] = self.control_record_type as u8;
        bytes[9] = self.character_coding as u8;
        bytes[10] = b'0' + self.indicator_count % 10;
        bytes[11] = b'0' + self.subfield_code_count % 10;
        write_digits(&mut bytes[12..17], self.data_base_address);
        bytes[17] = self.encoding_level as u8;
        bytes[18] = self.cataloging_form as u8;
        bytes[19] = self.multipart_level as u8;
        for (slot, ch) in bytes[20..24].iter_mut().zip(self.entry_map) {
            *slot = ch as u8;
        }
        bytes
    }

    /// The leader as a 24-character string.
    #[must_use]
    pub fn to_leader_string(&self) -> String {
        String::from_utf8_lossy(&self.as_bytes()).into_owned()
    }

    /// Broad record class.
    #[must_use]
    pub fn record_type_class(&self) -> RecordType {
        match self.record_type {
            'z' => RecordType::Authority,
            'w' => RecordType::Classification,
            c if "acdefgijkmoprt".contains(c) => RecordType::Bibliographic,
            _ => RecordType::Unknown,
        }
    }
}

fn parse_digits(bytes: &[u8], what: &str) -> Result<u32> {
    bytes.iter().try_fold(0u32, |acc, &b| {
        if b.is_ascii_digit() {
            Ok(acc * 10 + u32::from(b - b'0'))
        } else {
            Err(MarcError::MalformedLeader(format!(
                "Can't parse {what}: found {:?}",
                String::from_utf8_lossy(bytes)
            )))
        }
    })
}

fn parse_count(byte: u8, what: &str) -> Result<u8> {
    if byte.is_ascii_digit() {
        Ok(byte - b'0')
    } else {
        Err(MarcError::MalformedLeader(format!(
            "Invalid {what}: {:?}",
            byte as char
        )))
    }
}

fn write_digits(slot: &mut [u8], mut value: u32) {
    for byte in slot.iter_mut().rev() {
        // value % 10 < 10, the cast cannot truncate
        #[allow(clippy::cast_possible_truncation)]
        let digit = (value % 10) as u8;
        *byte = b'0' + digit;
        value /= 10;
    }
}
