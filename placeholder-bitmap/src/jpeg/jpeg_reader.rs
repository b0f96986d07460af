use byteorder::{BigEndian, ReadBytesExt};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use std::io::{Cursor, Seek, SeekFrom};

use crate::error::{Error, Result};

#[allow(clippy::upper_case_acronyms)]
#[derive(PartialEq, Eq, FromPrimitive, Debug, Clone, Copy)]
pub enum JPEGMarker {
    SOF0 = 0xFFC0, // Baseline DCT, the only frame type decoded
    SOF1 = 0xFFC1,
    SOF2 = 0xFFC2,
    SOF3 = 0xFFC3,
    DHT = 0xFFC4,

    RST0 = 0xFFD0,
    RST1 = 0xFFD1,
    RST2 = 0xFFD2,
    RST3 = 0xFFD3,
    RST4 = 0xFFD4,
    RST5 = 0xFFD5,
    RST6 = 0xFFD6,
    RST7 = 0xFFD7,

    SOI = 0xFFD8,
    EOI = 0xFFD9,
    SOS = 0xFFDA,
    DQT = 0xFFDB,
    DNL = 0xFFDC,
    DRI = 0xFFDD,
    DHP = 0xFFDE,
    EXP = 0xFFDF,

    APP0 = 0xFFE0,
    APP1 = 0xFFE1,
    APP2 = 0xFFE2,
    APP3 = 0xFFE3,
    APP4 = 0xFFE4,
    APP5 = 0xFFE5,
    APP6 = 0xFFE6,
    APP7 = 0xFFE7,
    APP8 = 0xFFE8,
    APP9 = 0xFFE9,
    APP10 = 0xFFEA,
    APP11 = 0xFFEB,
    APP12 = 0xFFEC,
    APP13 = 0xFFED,
    APP14 = 0xFFEE,
    APP15 = 0xFFEF,

    COM = 0xFFFE,
}

impl JPEGMarker {
    /// Restart markers carry no length field.
    pub fn is_restart(self) -> bool {
        (JPEGMarker::RST0 as u16..=JPEGMarker::RST7 as u16).contains(&(self as u16))
    }
}

pub struct JPEGParser<'data> {
    cursor: Cursor<&'data [u8]>,
}

impl<'data> JPEGParser<'data> {
    pub fn new(data: &'data [u8]) -> Self {
        Self {
            cursor: Cursor::new(data),
        }
    }

    pub fn to_marker(word: u16) -> Result<JPEGMarker> {
        JPEGMarker::from_u16(word).ok_or(Error::Malformed("Marker not supported"))
    }

    pub fn read_next_word(&mut self) -> Result<u16> {
        self.cursor
            .read_u16::<BigEndian>()
            .map_err(|_| Error::Malformed("Unexpected end of input"))
    }

    pub fn read_next_byte(&mut self) -> Result<u8> {
        self.cursor
            .read_u8()
            .map_err(|_| Error::Malformed("Unexpected end of input"))
    }

    /// Reads a segment length and returns the payload size that follows it.
    pub fn read_segment_length(&mut self) -> Result<u16> {
        self.read_next_word()?
            .checked_sub(2)
            .ok_or(Error::Malformed("Segment length shorter than its own field"))
    }

    pub fn read_next_marker(&mut self) -> Result<JPEGMarker> {
        let word = self.read_next_word()?;
        if let Ok(marker) = Self::to_marker(word) {
            return Ok(marker);
        }

        // Any number of 0xFF fill bytes may precede a marker.
        if word != 0xFFFF {
            return Err(Error::Malformed("Invalid JPEG file"));
        }
        loop {
            match self.read_next_byte()? {
                0xFF => continue,
                0x00 => return Err(Error::Malformed("Invalid JPEG file")),
                next => return Self::to_marker(0xFF00 | next as u16),
            }
        }
    }

    pub fn skip_marker_with_length(&mut self) -> Result<()> {
        let byte_length = self.read_segment_length()? as u64;
        let remaining = self.cursor.get_ref().len() as u64 - self.position();
        if byte_length > remaining {
            return Err(Error::Malformed(
                "JPEG marker with length contained a length longer than the remaining size of the JPEG file",
            ));
        }
        self.cursor
            .seek(SeekFrom::Current(byte_length as i64))
            .map_err(|_| Error::Malformed("Unexpected end of input"))?;
        Ok(())
    }

    pub fn position(&self) -> u64 {
        self.cursor.position()
    }
}

#[rustfmt::skip]
#[allow(dead_code)]
static TEST_HEADER: [u8; 30] = [
    0xFF, 0xD8, // Start of image
    0xFF, 0xC0, // Start of frame
    0, 17,          // Length
    8,              // Precision
    0, 128,         // Height
    0, 128,         // Width
    3,              // Component count
    0, 0, 0,
    0, 0, 0,
    0, 0, 0,        // Component data
    0xFF, 0xFF, // Fill byte
    0xFF, 0xFE, // Commment
    0, 3,           // Length
    65,             // Content
    0xFF, 0x01  // Invalid marker
];

#[test]
fn read_words() {
    let mut reader = JPEGParser::new(&TEST_HEADER);
    assert_eq!(reader.read_next_byte().unwrap(), 0xFF);
    assert_eq!(reader.read_next_byte().unwrap(), 0xD8);

    assert_eq!(reader.read_next_word().unwrap(), 0xFFC0);
}

#[test]
fn read_markers() {
    let mut reader = JPEGParser::new(&TEST_HEADER);
    assert_eq!(reader.read_next_marker().unwrap(), JPEGMarker::SOI);
    assert_eq!(reader.read_next_marker().unwrap(), JPEGMarker::SOF0);
    assert!(reader.skip_marker_with_length().is_ok());
    assert_eq!(reader.read_next_marker().unwrap(), JPEGMarker::COM);
    assert!(reader.skip_marker_with_length().is_ok());
    assert!(reader.read_next_marker().is_err());
}

#[test]
fn rejects_overlong_segment() {
    let data = [0xFF, 0xFE, 0x00, 0x10, 0x41];
    let mut reader = JPEGParser::new(&data);
    assert_eq!(reader.read_next_marker().unwrap(), JPEGMarker::COM);
    assert!(reader.skip_marker_with_length().is_err());
}

#[test]
fn restart_markers_are_recognised() {
    assert!(JPEGMarker::RST3.is_restart());
    assert!(!JPEGMarker::SOS.is_restart());
}
