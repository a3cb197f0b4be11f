//! # Entity Frame Encoding
//!
//! Fixed header plus the incremental attribute extension.

use vantage_shared::{Vec3, ENTITY_HEADER_SIZE};

use crate::attributes::AttributeValue;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult, WireError, WireResult};

use super::reader::FrameReader;
use super::writer::FrameWriter;

/// Fixed-layout core fields of an entity.
///
/// Size: 32 bytes on the wire
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EntityHeader {
    /// Entity identifier.
    pub id: u64,
    /// Entity classification tag.
    pub kind: u64,
    /// Committed position.
    pub position: Vec3,
    /// Scan radius.
    pub range: u32,
}

impl EntityHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = ENTITY_HEADER_SIZE;

    /// Writes the header in wire order.
    pub fn write(&self, writer: &mut FrameWriter) {
        writer.write_u64(self.id);
        writer.write_u64(self.kind);
        writer.write_f32(self.position.x);
        writer.write_f32(self.position.y);
        writer.write_f32(self.position.z);
        writer.write_u32(self.range);
    }

    /// Reads a header in wire order.
    pub fn read(reader: &mut FrameReader<'_>) -> WireResult<Self> {
        let id = reader.read_u64()?;
        let kind = reader.read_u64()?;
        let x = reader.read_f32()?;
        let y = reader.read_f32()?;
        let z = reader.read_f32()?;
        let range = reader.read_u32()?;
        Ok(Self {
            id,
            kind,
            position: Vec3::new(x, y, z),
            range,
        })
    }
}

/// Wire tag for an attribute entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum AttributeTag {
    /// Key was unset since the client last looked.
    Removed = 0,
    /// Boolean.
    Bool = 1,
    /// Signed 64-bit integer.
    Int = 2,
    /// 64-bit float.
    Float = 3,
    /// Length-prefixed UTF-8.
    Text = 4,
    /// Length-prefixed raw bytes.
    Bytes = 5,
    /// Three 32-bit floats.
    Vec3 = 6,
}

impl AttributeTag {
    /// Tag for an optional value (`None` = removed).
    #[must_use]
    pub const fn of(value: Option<&AttributeValue>) -> Self {
        match value {
            None => Self::Removed,
            Some(AttributeValue::Bool(_)) => Self::Bool,
            Some(AttributeValue::Int(_)) => Self::Int,
            Some(AttributeValue::Float(_)) => Self::Float,
            Some(AttributeValue::Text(_)) => Self::Text,
            Some(AttributeValue::Bytes(_)) => Self::Bytes,
            Some(AttributeValue::Vec3(_)) => Self::Vec3,
        }
    }

    /// Parses a wire tag.
    pub const fn from_u8(tag: u8) -> WireResult<Self> {
        match tag {
            0 => Ok(Self::Removed),
            1 => Ok(Self::Bool),
            2 => Ok(Self::Int),
            3 => Ok(Self::Float),
            4 => Ok(Self::Text),
            5 => Ok(Self::Bytes),
            6 => Ok(Self::Vec3),
            other => Err(WireError::UnknownTag(other)),
        }
    }
}

/// A decoded entity frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntityFrame {
    /// Core fields.
    pub header: EntityHeader,
    /// Changed attributes in send order; `None` means removed.
    pub attributes: Vec<(String, Option<AttributeValue>)>,
}

/// Encodes one entity frame into `writer`, replacing its contents.
///
/// The attribute extension is only written when `attributes` is non-empty,
/// so an unchanged entity costs exactly the header.
pub fn encode_entity_frame(
    header: &EntityHeader,
    attributes: &[(String, Option<AttributeValue>)],
    config: &SyncConfig,
    writer: &mut FrameWriter,
) -> SyncResult<()> {
    write_frame(header, attributes.iter(), config, writer)
}

/// Frames produced for one entity and one recipient.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameBatch {
    /// Encoded frames in send order.
    pub frames: Vec<Vec<u8>>,
    /// Attributes left out, with the reason.
    pub rejected: Vec<(String, SyncError)>,
}

/// Encodes one entity into as many frames as the budget requires.
///
/// Attributes are packed greedily in order and every frame repeats the
/// header. An attribute that cannot fit even in a frame of its own is
/// skipped and reported in `rejected`. At least one frame is produced
/// whenever the header alone fits the budget, so the recipient learns about
/// the entity even if every attribute is rejected.
pub fn encode_entity_frames(
    header: &EntityHeader,
    attributes: &[(String, Option<AttributeValue>)],
    config: &SyncConfig,
    writer: &mut FrameWriter,
) -> FrameBatch {
    const BASE: usize = EntityHeader::SIZE + 2;

    let mut batch = FrameBatch::default();
    let mut chunk: Vec<&(String, Option<AttributeValue>)> = Vec::new();
    let mut size = BASE;

    for entry in attributes {
        let (key, value) = entry;
        let len = match entry_len(key, value.as_ref(), config) {
            Ok(len) => len,
            Err(error) => {
                batch.rejected.push((key.clone(), error));
                continue;
            }
        };
        if BASE + len > config.max_frame_bytes {
            batch.rejected.push((
                key.clone(),
                SyncError::FrameTooLarge {
                    size: BASE + len,
                    max: config.max_frame_bytes,
                },
            ));
            continue;
        }
        if size + len > config.max_frame_bytes || chunk.len() == usize::from(u16::MAX) {
            flush_chunk(&mut batch, header, &chunk, config, writer);
            chunk.clear();
            size = BASE;
        }
        chunk.push(entry);
        size += len;
    }

    if !chunk.is_empty() || batch.frames.is_empty() {
        flush_chunk(&mut batch, header, &chunk, config, writer);
    }
    batch
}

fn flush_chunk(
    batch: &mut FrameBatch,
    header: &EntityHeader,
    chunk: &[&(String, Option<AttributeValue>)],
    config: &SyncConfig,
    writer: &mut FrameWriter,
) {
    match write_frame(header, chunk.iter().copied(), config, writer) {
        Ok(()) => batch.frames.push(writer.to_vec()),
        Err(error) => {
            for (key, _) in chunk.iter().copied() {
                batch.rejected.push((key.clone(), error.clone()));
            }
        }
    }
}

fn write_frame<'a, I>(
    header: &EntityHeader,
    attributes: I,
    config: &SyncConfig,
    writer: &mut FrameWriter,
) -> SyncResult<()>
where
    I: ExactSizeIterator<Item = &'a (String, Option<AttributeValue>)>,
{
    writer.reset();
    header.write(writer);

    if attributes.len() > 0 {
        let count = u16::try_from(attributes.len())
            .map_err(|_| SyncError::TooManyAttributes(attributes.len()))?;
        writer.write_u16(count);
        for (key, value) in attributes {
            write_attribute(writer, key, value.as_ref(), config)?;
            // Bail early instead of encoding megabytes we will throw away.
            check_size(writer, config)?;
        }
    }

    check_size(writer, config)
}

/// Encoded size of one extension entry, validating the key and value limits.
fn entry_len(key: &str, value: Option<&AttributeValue>, config: &SyncConfig) -> SyncResult<usize> {
    check_key(key, config)?;
    let payload = match value {
        None => 0,
        Some(AttributeValue::Bool(_)) => 1,
        Some(AttributeValue::Int(_) | AttributeValue::Float(_)) => 8,
        Some(AttributeValue::Text(v)) => blob_entry_len(v.len())?,
        Some(AttributeValue::Bytes(v)) => blob_entry_len(v.len())?,
        Some(AttributeValue::Vec3(_)) => 12,
    };
    Ok(2 + key.len() + 1 + payload)
}

fn blob_entry_len(len: usize) -> SyncResult<usize> {
    u32::try_from(len).map_err(|_| SyncError::ValueTooLong(len))?;
    Ok(4 + len)
}

fn check_key(key: &str, config: &SyncConfig) -> SyncResult<u16> {
    let key_len = key.len();
    if key_len > config.max_key_len {
        return Err(SyncError::KeyTooLong {
            len: key_len,
            max: config.max_key_len,
        });
    }
    u16::try_from(key_len).map_err(|_| SyncError::KeyTooLong {
        len: key_len,
        max: usize::from(u16::MAX),
    })
}

fn check_size(writer: &FrameWriter, config: &SyncConfig) -> SyncResult<()> {
    if writer.len() > config.max_frame_bytes {
        return Err(SyncError::FrameTooLarge {
            size: writer.len(),
            max: config.max_frame_bytes,
        });
    }
    Ok(())
}

fn write_attribute(
    writer: &mut FrameWriter,
    key: &str,
    value: Option<&AttributeValue>,
    config: &SyncConfig,
) -> SyncResult<()> {
    let key_len = check_key(key, config)?;
    writer.write_u16(key_len);
    writer.write_bytes(key.as_bytes());
    writer.write_u8(AttributeTag::of(value) as u8);

    match value {
        None => {}
        Some(AttributeValue::Bool(v)) => writer.write_u8(u8::from(*v)),
        Some(AttributeValue::Int(v)) => writer.write_i64(*v),
        Some(AttributeValue::Float(v)) => writer.write_f64(*v),
        Some(AttributeValue::Text(v)) => write_blob(writer, v.as_bytes())?,
        Some(AttributeValue::Bytes(v)) => write_blob(writer, v)?,
        Some(AttributeValue::Vec3(v)) => {
            writer.write_f32(v.x);
            writer.write_f32(v.y);
            writer.write_f32(v.z);
        }
    }
    Ok(())
}

fn write_blob(writer: &mut FrameWriter, bytes: &[u8]) -> SyncResult<()> {
    let len = u32::try_from(bytes.len()).map_err(|_| SyncError::ValueTooLong(bytes.len()))?;
    writer.write_u32(len);
    writer.write_bytes(bytes);
    Ok(())
}

/// Decodes a complete entity frame.
pub fn decode_entity_frame(bytes: &[u8]) -> WireResult<EntityFrame> {
    let mut reader = FrameReader::new(bytes);
    let header = EntityHeader::read(&mut reader)?;

    let mut attributes = Vec::new();
    if reader.remaining() > 0 {
        let count = reader.read_u16()?;
        attributes.reserve(usize::from(count));
        for _ in 0..count {
            attributes.push(read_attribute(&mut reader)?);
        }
    }

    if reader.remaining() > 0 {
        return Err(WireError::TrailingBytes(reader.remaining()));
    }
    Ok(EntityFrame { header, attributes })
}

fn read_attribute(reader: &mut FrameReader<'_>) -> WireResult<(String, Option<AttributeValue>)> {
    let key_len = usize::from(reader.read_u16()?);
    let key = reader.read_str(key_len)?.to_owned();
    let value = match AttributeTag::from_u8(reader.read_u8()?)? {
        AttributeTag::Removed => None,
        AttributeTag::Bool => Some(AttributeValue::Bool(reader.read_u8()? != 0)),
        AttributeTag::Int => Some(AttributeValue::Int(reader.read_i64()?)),
        AttributeTag::Float => Some(AttributeValue::Float(reader.read_f64()?)),
        AttributeTag::Text => {
            let len = blob_len(reader)?;
            Some(AttributeValue::Text(reader.read_str(len)?.to_owned()))
        }
        AttributeTag::Bytes => {
            let len = blob_len(reader)?;
            Some(AttributeValue::Bytes(reader.read_bytes(len)?.to_vec()))
        }
        AttributeTag::Vec3 => {
            let x = reader.read_f32()?;
            let y = reader.read_f32()?;
            let z = reader.read_f32()?;
            Some(AttributeValue::Vec3(Vec3::new(x, y, z)))
        }
    };
    Ok((key, value))
}

fn blob_len(reader: &mut FrameReader<'_>) -> WireResult<usize> {
    reader.read_u32().map(|len| len as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> EntityHeader {
        EntityHeader {
            id: 42,
            kind: 7,
            position: Vec3::new(1.5, 2.5, 3.5),
            range: 100,
        }
    }

    #[test]
    fn test_header_only_frame() {
        let mut writer = FrameWriter::new();
        encode_entity_frame(&header(), &[], &SyncConfig::default(), &mut writer).unwrap();
        assert_eq!(writer.len(), EntityHeader::SIZE);

        let frame = decode_entity_frame(writer.as_slice()).unwrap();
        assert_eq!(frame.header, header());
        assert!(frame.attributes.is_empty());
    }

    #[test]
    fn test_attribute_extension_layout() {
        let mut writer = FrameWriter::new();
        let attributes = vec![("hp".to_string(), Some(AttributeValue::Int(-1)))];
        encode_entity_frame(&header(), &attributes, &SyncConfig::default(), &mut writer).unwrap();

        let ext = &writer.as_slice()[EntityHeader::SIZE..];
        let mut expected = vec![1, 0, 2, 0, b'h', b'p', AttributeTag::Int as u8];
        expected.extend_from_slice(&(-1_i64).to_le_bytes());
        assert_eq!(ext, expected.as_slice());
    }

    #[test]
    fn test_every_tag_decodes() {
        let attributes = vec![
            ("gone".to_string(), None),
            ("alive".to_string(), Some(AttributeValue::Bool(true))),
            ("hp".to_string(), Some(AttributeValue::Int(i64::MIN))),
            ("speed".to_string(), Some(AttributeValue::Float(0.25))),
            ("name".to_string(), Some(AttributeValue::Text("wyrm".to_string()))),
            ("blob".to_string(), Some(AttributeValue::Bytes(vec![0, 1, 255]))),
            ("aim".to_string(), Some(AttributeValue::Vec3(Vec3::new(0.0, -1.0, 2.0)))),
        ];
        let mut writer = FrameWriter::new();
        encode_entity_frame(&header(), &attributes, &SyncConfig::default(), &mut writer).unwrap();

        let frame = decode_entity_frame(writer.as_slice()).unwrap();
        assert_eq!(frame.attributes, attributes);
    }

    #[test]
    fn test_key_too_long() {
        let config = SyncConfig {
            max_key_len: 4,
            ..SyncConfig::default()
        };
        let attributes = vec![("toolong".to_string(), None)];
        let mut writer = FrameWriter::new();
        let err = encode_entity_frame(&header(), &attributes, &config, &mut writer).unwrap_err();
        assert_eq!(err, SyncError::KeyTooLong { len: 7, max: 4 });
    }

    #[test]
    fn test_frame_too_large() {
        let config = SyncConfig {
            max_frame_bytes: 64,
            ..SyncConfig::default()
        };
        let attributes = vec![("blob".to_string(), Some(AttributeValue::Bytes(vec![0; 128])))];
        let mut writer = FrameWriter::new();
        let err = encode_entity_frame(&header(), &attributes, &config, &mut writer).unwrap_err();
        assert!(matches!(err, SyncError::FrameTooLarge { max: 64, .. }));
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let mut writer = FrameWriter::new();
        header().write(&mut writer);
        writer.write_u16(1);
        writer.write_u16(1);
        writer.write_bytes(b"k");
        writer.write_u8(99);
        assert_eq!(
            decode_entity_frame(writer.as_slice()),
            Err(WireError::UnknownTag(99))
        );
    }

    #[test]
    fn test_truncated_header_rejected() {
        let err = decode_entity_frame(&[0; 20]).unwrap_err();
        assert!(matches!(err, WireError::Truncated { .. }));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut writer = FrameWriter::new();
        header().write(&mut writer);
        writer.write_u16(0);
        writer.write_u8(0);
        assert_eq!(
            decode_entity_frame(writer.as_slice()),
            Err(WireError::TrailingBytes(1))
        );
    }

    #[test]
    fn test_batch_fits_in_one_frame_when_possible() {
        let attributes = vec![("hp".to_string(), Some(AttributeValue::Int(5)))];
        let mut writer = FrameWriter::new();
        let batch = encode_entity_frames(&header(), &attributes, &SyncConfig::default(), &mut writer);

        let mut single = FrameWriter::new();
        encode_entity_frame(&header(), &attributes, &SyncConfig::default(), &mut single).unwrap();
        assert_eq!(batch.frames, vec![single.to_vec()]);
        assert!(batch.rejected.is_empty());
    }

    #[test]
    fn test_batch_splits_at_budget() {
        let config = SyncConfig {
            max_frame_bytes: 64,
            ..SyncConfig::default()
        };
        // Each entry: 2 + 1 + 1 + 8 = 12 bytes, 34 + 2 * 12 = 58 fits, three do not.
        let attributes: Vec<_> = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|key| (key.to_string(), Some(AttributeValue::Int(1))))
            .collect();
        let mut writer = FrameWriter::new();
        let batch = encode_entity_frames(&header(), &attributes, &config, &mut writer);

        assert!(batch.rejected.is_empty());
        assert_eq!(batch.frames.len(), 3);
        let decoded: Vec<_> = batch
            .frames
            .iter()
            .flat_map(|bytes| decode_entity_frame(bytes).unwrap().attributes)
            .collect();
        assert_eq!(decoded, attributes);
    }

    #[test]
    fn test_batch_rejects_oversized_and_keeps_header() {
        let config = SyncConfig {
            max_frame_bytes: 64,
            max_key_len: 4,
            ..SyncConfig::default()
        };
        let attributes = vec![
            ("blob".to_string(), Some(AttributeValue::Bytes(vec![0; 128]))),
            ("toolong".to_string(), None),
        ];
        let mut writer = FrameWriter::new();
        let batch = encode_entity_frames(&header(), &attributes, &config, &mut writer);

        assert_eq!(batch.frames.len(), 1);
        assert_eq!(batch.frames[0].len(), EntityHeader::SIZE);
        assert_eq!(batch.rejected.len(), 2);
        assert!(matches!(batch.rejected[0].1, SyncError::FrameTooLarge { max: 64, .. }));
        assert_eq!(batch.rejected[1].1, SyncError::KeyTooLong { len: 7, max: 4 });
    }
}
