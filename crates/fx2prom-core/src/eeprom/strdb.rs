//! Packed string database
//!
//! Layout: `count (u8) | { len (u8) | utf-8 bytes }* | zero padding`, filling
//! exactly [`STR_DB_LEN`] bytes.

use alloc::string::String;
use alloc::vec::Vec;

use crate::error::{Error, Result, UnpackFault};

/// Size of the string database area
pub const STR_DB_LEN: usize = 2048;

/// Maximum number of strings in the database
pub const MAX_STRINGS: usize = 32;

/// Maximum length of a single string in bytes
pub const MAX_STRING_LEN: usize = u8::MAX as usize;

/// Pack `strings` into a [`STR_DB_LEN`]-byte buffer
pub fn pack_strings<S: AsRef<str>>(strings: &[S]) -> Result<Vec<u8>> {
    if strings.len() > MAX_STRINGS {
        return Err(UnpackFault::TooManyStrings.into());
    }

    let mut out = Vec::with_capacity(STR_DB_LEN);
    out.push(strings.len() as u8);
    for s in strings {
        let bytes = s.as_ref().as_bytes();
        if bytes.len() > MAX_STRING_LEN {
            return Err(UnpackFault::StringTooLong.into());
        }
        out.push(bytes.len() as u8);
        out.extend_from_slice(bytes);
    }

    if out.len() > STR_DB_LEN {
        return Err(Error::StringDbOverflow);
    }
    out.resize(STR_DB_LEN, 0);
    Ok(out)
}

/// Unpack a string database
///
/// Bytes after the last string are ignored.
pub fn unpack_strings(data: &[u8]) -> Result<Vec<String>> {
    let (&count, mut rest) = data.split_first().ok_or(UnpackFault::Truncated)?;
    let count = count as usize;
    if count > MAX_STRINGS {
        return Err(UnpackFault::TooManyStrings.into());
    }

    let mut strings = Vec::with_capacity(count);
    for _ in 0..count {
        let (&len, tail) = rest.split_first().ok_or(UnpackFault::Truncated)?;
        let len = len as usize;
        if tail.len() < len {
            return Err(UnpackFault::Truncated.into());
        }
        let (bytes, tail) = tail.split_at(len);
        let s = core::str::from_utf8(bytes).map_err(|_| UnpackFault::InvalidUtf8)?;
        strings.push(String::from(s));
        rest = tail;
    }
    Ok(strings)
}

/// String database with named slots
///
/// Slot order matches the positional layout on the device. Strings beyond
/// the named slots are carried in `extra` so nothing is lost on rewrite.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct StrDb {
    pub factory_sn: String,
    pub customer_sn: String,
    pub id: String,
    pub platform: String,
    pub part_num: String,
    pub ccd: String,
    pub ccd_sn: String,
    pub ccd_grade: String,
    pub proc_board_rev: String,
    pub drive_board_rev: String,
    pub shutter: String,
    pub window_type: String,
    pub mech_config: String,
    pub opt_config: String,
    /// Entries past the named slots, kept verbatim
    pub extra: Vec<String>,
}

impl StrDb {
    /// Number of named slots
    pub const NAMED_SLOTS: usize = 14;

    fn slots_mut(&mut self) -> [&mut String; Self::NAMED_SLOTS] {
        [
            &mut self.factory_sn,
            &mut self.customer_sn,
            &mut self.id,
            &mut self.platform,
            &mut self.part_num,
            &mut self.ccd,
            &mut self.ccd_sn,
            &mut self.ccd_grade,
            &mut self.proc_board_rev,
            &mut self.drive_board_rev,
            &mut self.shutter,
            &mut self.window_type,
            &mut self.mech_config,
            &mut self.opt_config,
        ]
    }

    /// Build from the positional list; missing slots are left empty
    pub fn from_strings(strings: Vec<String>) -> Self {
        let mut db = Self::default();
        let mut iter = strings.into_iter();
        for (slot, value) in db.slots_mut().into_iter().zip(iter.by_ref()) {
            *slot = value;
        }
        db.extra = iter.collect();
        db
    }

    /// Flatten to the positional list (every named slot, then `extra`)
    pub fn to_strings(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(Self::NAMED_SLOTS + self.extra.len());
        out.extend(
            [
                &self.factory_sn,
                &self.customer_sn,
                &self.id,
                &self.platform,
                &self.part_num,
                &self.ccd,
                &self.ccd_sn,
                &self.ccd_grade,
                &self.proc_board_rev,
                &self.drive_board_rev,
                &self.shutter,
                &self.window_type,
                &self.mech_config,
                &self.opt_config,
            ]
            .into_iter()
            .cloned(),
        );
        out.extend(self.extra.iter().cloned());
        out
    }

    /// Unpack from raw database bytes
    pub fn unpack(data: &[u8]) -> Result<Self> {
        Ok(Self::from_strings(unpack_strings(data)?))
    }

    /// Pack to a [`STR_DB_LEN`]-byte buffer
    pub fn pack(&self) -> Result<Vec<u8>> {
        pack_strings(&self.to_strings())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;
    use alloc::string::ToString;
    use alloc::vec;
    use proptest::prelude::*;

    #[test]
    fn test_empty_list() {
        let empty: [&str; 0] = [];
        let packed = pack_strings(&empty).unwrap();
        assert_eq!(packed.len(), STR_DB_LEN);
        assert!(packed.iter().all(|&b| b == 0));
        assert!(unpack_strings(&packed).unwrap().is_empty());
    }

    #[test]
    fn test_layout() {
        let packed = pack_strings(&["AB", "", "xyz"]).unwrap();
        assert_eq!(&packed[..9], &[3, 2, b'A', b'B', 0, 3, b'x', b'y', b'z']);
        assert!(packed[9..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_max_strings() {
        let strings: Vec<String> = (0..MAX_STRINGS).map(|i| format!("s{}", i)).collect();
        let packed = pack_strings(&strings).unwrap();
        assert_eq!(unpack_strings(&packed).unwrap(), strings);

        let mut too_many = strings.clone();
        too_many.push("x".to_string());
        assert_eq!(
            pack_strings(&too_many),
            Err(Error::Unpack(UnpackFault::TooManyStrings))
        );
    }

    #[test]
    fn test_string_too_long() {
        let long = "a".repeat(256);
        assert_eq!(
            pack_strings(&[long]),
            Err(Error::Unpack(UnpackFault::StringTooLong))
        );
    }

    #[test]
    fn test_overflow() {
        let big = "b".repeat(255);
        let strings = vec![big; 9];
        assert_eq!(pack_strings(&strings), Err(Error::StringDbOverflow));
    }

    #[test]
    fn test_blank_eeprom_rejected() {
        let blank = [0xFFu8; STR_DB_LEN];
        assert_eq!(
            unpack_strings(&blank),
            Err(Error::Unpack(UnpackFault::TooManyStrings))
        );
    }

    #[test]
    fn test_truncated() {
        assert_eq!(unpack_strings(&[]), Err(Error::Unpack(UnpackFault::Truncated)));
        assert_eq!(
            unpack_strings(&[2, 1, b'a', 5, b'b']),
            Err(Error::Unpack(UnpackFault::Truncated))
        );
    }

    #[test]
    fn test_invalid_utf8() {
        assert_eq!(
            unpack_strings(&[1, 2, 0xC3, 0x28]),
            Err(Error::Unpack(UnpackFault::InvalidUtf8))
        );
    }

    #[test]
    fn test_named_slots() {
        let strings: Vec<String> = (0..16).map(|i| format!("v{}", i)).collect();
        let db = StrDb::from_strings(strings.clone());
        assert_eq!(db.factory_sn, "v0");
        assert_eq!(db.customer_sn, "v1");
        assert_eq!(db.opt_config, "v13");
        assert_eq!(db.extra, vec!["v14".to_string(), "v15".to_string()]);
        assert_eq!(db.to_strings(), strings);
    }

    #[test]
    fn test_short_list_fills_named_slots() {
        let db = StrDb::from_strings(vec!["FSN".to_string(), "CSN".to_string()]);
        assert_eq!(db.customer_sn, "CSN");
        assert!(db.platform.is_empty());
        assert_eq!(db.to_strings().len(), StrDb::NAMED_SLOTS);
        assert_eq!(StrDb::unpack(&db.pack().unwrap()).unwrap(), db);
    }

    proptest! {
        #[test]
        fn strings_round_trip(strings in prop::collection::vec("[ -~]{0,40}", 0..=MAX_STRINGS)) {
            let packed = pack_strings(&strings).unwrap();
            prop_assert_eq!(packed.len(), STR_DB_LEN);
            prop_assert_eq!(unpack_strings(&packed).unwrap(), strings);
        }

        #[test]
        fn unicode_round_trip(strings in prop::collection::vec("\\PC{0,8}", 0..8)) {
            let packed = pack_strings(&strings).unwrap();
            prop_assert_eq!(unpack_strings(&packed).unwrap(), strings);
        }
    }
}
