use crate::entities::slots::SlotType;
use crate::error::{StoreError, StoreResult};
use crate::persistence::records::{EvolvingRecord, ItemRecord, SlotRecord};
use base64::engine::general_purpose::STANDARD as BASE64_ENGINE;
use base64::Engine as _;
use std::collections::BTreeMap;

const RECORD_MAGIC: u32 = 0x4c45_4853; // "SHEL"
const RECORD_VERSION: u8 = 1;

/// Bag, item in bag, augment on that item.
const MAX_NESTING: usize = 3;

#[derive(Debug, Clone)]
pub struct RecordReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> RecordReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn read_u8(&mut self) -> Option<u8> {
        let value = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(value)
    }

    pub fn read_u16_le(&mut self) -> Option<u16> {
        let bytes = self.read_bytes(2)?;
        Some(u16::from(bytes[0]) | (u16::from(bytes[1]) << 8))
    }

    pub fn read_u32_le(&mut self) -> Option<u32> {
        let bytes = self.read_bytes(4)?;
        Some(
            u32::from(bytes[0])
                | (u32::from(bytes[1]) << 8)
                | (u32::from(bytes[2]) << 16)
                | (u32::from(bytes[3]) << 24),
        )
    }

    pub fn read_u64_le(&mut self) -> Option<u64> {
        let low = u64::from(self.read_u32_le()?);
        let high = u64::from(self.read_u32_le()?);
        Some(low | (high << 32))
    }

    pub fn read_i16_le(&mut self) -> Option<i16> {
        self.read_u16_le().map(|value| value as i16)
    }

    /// Length-prefixed text; `None` when the bytes run out.
    pub fn read_string(&mut self) -> Option<Result<&'a str, std::str::Utf8Error>> {
        let len = usize::from(self.read_u16_le()?);
        self.read_bytes(len).map(std::str::from_utf8)
    }

    pub fn read_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        if self.remaining() < len {
            return None;
        }
        let start = self.pos;
        self.pos += len;
        Some(&self.data[start..start + len])
    }
}

#[derive(Debug, Default, Clone)]
pub struct RecordWriter {
    data: Vec<u8>,
}

impl RecordWriter {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    pub fn write_u8(&mut self, value: u8) {
        self.data.push(value);
    }

    pub fn write_u16_le(&mut self, value: u16) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32_le(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u64_le(&mut self, value: u64) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i16_le(&mut self, value: i16) {
        self.write_u16_le(value as u16);
    }

    /// Length-prefixed; anything past `u16::MAX` bytes is cut off.
    pub fn write_string(&mut self, value: &str) {
        let mut len = value.len().min(usize::from(u16::MAX));
        while !value.is_char_boundary(len) {
            len -= 1;
        }
        self.write_u16_le(len as u16);
        self.data.extend_from_slice(&value.as_bytes()[..len]);
    }
}

/// Binary form of a record list: magic, version, count, then each record.
pub fn encode_records(records: &[SlotRecord]) -> Vec<u8> {
    let mut writer = RecordWriter::new();
    writer.write_u32_le(RECORD_MAGIC);
    writer.write_u8(RECORD_VERSION);
    writer.write_u32_le(records.len() as u32);
    for record in records {
        writer.write_i16_le(record.slot_id);
        match record.slot_type {
            Some(slot_type) => {
                writer.write_u8(1);
                writer.write_i16_le(slot_type as i16);
            }
            None => writer.write_u8(0),
        }
        write_item(&mut writer, &record.item);
    }
    writer.into_vec()
}

fn write_item(writer: &mut RecordWriter, item: &ItemRecord) {
    writer.write_u32_le(item.definition_id);
    writer.write_i16_le(item.charges);
    writer.write_u32_le(item.color);
    writer.write_u8(u8::from(item.instance_no_drop));
    writer.write_u64_le(item.serial_number);

    writer.write_u16_le(item.custom_data.len().min(usize::from(u16::MAX)) as u16);
    for (key, value) in item.custom_data.iter().take(usize::from(u16::MAX)) {
        writer.write_string(key);
        writer.write_string(value);
    }

    match item.evolving {
        Some(evolving) => {
            writer.write_u8(1);
            writer.write_u32_le(evolving.exp);
            writer.write_u8(evolving.evolve_level as u8);
            writer.write_u8(u8::from(evolving.activated));
        }
        None => writer.write_u8(0),
    }

    writer.write_u8(item.children.len().min(usize::from(u8::MAX)) as u8);
    for (sub, child) in item.children.iter().take(usize::from(u8::MAX)) {
        writer.write_u8(*sub);
        write_item(writer, child);
    }
}

pub fn decode_records(data: &[u8]) -> StoreResult<Vec<SlotRecord>> {
    let mut reader = RecordReader::new(data);
    let magic = reader.read_u32_le().ok_or(StoreError::Truncated("header"))?;
    if magic != RECORD_MAGIC {
        return Err(StoreError::Config(format!("bad record magic {magic:#010x}")));
    }
    let version = reader.read_u8().ok_or(StoreError::Truncated("header"))?;
    if version != RECORD_VERSION {
        return Err(StoreError::Config(format!("unsupported record version {version}")));
    }
    let count = reader.read_u32_le().ok_or(StoreError::Truncated("record count"))?;

    let mut records = Vec::new();
    for _ in 0..count {
        let slot_id = reader.read_i16_le().ok_or(StoreError::Truncated("slot id"))?;
        let slot_type = match reader.read_u8().ok_or(StoreError::Truncated("slot type"))? {
            0 => None,
            _ => {
                let raw = reader.read_i16_le().ok_or(StoreError::Truncated("slot type"))?;
                let slot_type = SlotType::from_i16(raw)
                    .ok_or_else(|| StoreError::Config(format!("unknown slot type {raw}")))?;
                Some(slot_type)
            }
        };
        let item = read_item(&mut reader, 0)?;
        records.push(SlotRecord {
            slot_id,
            slot_type,
            item,
        });
    }
    if reader.remaining() != 0 {
        return Err(StoreError::Config(format!(
            "{} trailing bytes after records",
            reader.remaining()
        )));
    }
    Ok(records)
}

fn read_item(reader: &mut RecordReader<'_>, depth: usize) -> StoreResult<ItemRecord> {
    if depth >= MAX_NESTING {
        return Err(StoreError::Config("item records nested too deeply".to_string()));
    }
    let definition_id = reader.read_u32_le().ok_or(StoreError::Truncated("item"))?;
    let charges = reader.read_i16_le().ok_or(StoreError::Truncated("item"))?;
    let color = reader.read_u32_le().ok_or(StoreError::Truncated("item"))?;
    let instance_no_drop = reader.read_u8().ok_or(StoreError::Truncated("item"))? != 0;
    let serial_number = reader.read_u64_le().ok_or(StoreError::Truncated("item"))?;

    let entries = reader.read_u16_le().ok_or(StoreError::Truncated("custom data"))?;
    let mut custom_data = BTreeMap::new();
    for _ in 0..entries {
        let key = read_text(reader)?;
        let value = read_text(reader)?;
        custom_data.insert(key, value);
    }

    let evolving = match reader.read_u8().ok_or(StoreError::Truncated("evolving"))? {
        0 => None,
        _ => Some(EvolvingRecord {
            exp: reader.read_u32_le().ok_or(StoreError::Truncated("evolving"))?,
            evolve_level: reader.read_u8().ok_or(StoreError::Truncated("evolving"))? as i8,
            activated: reader.read_u8().ok_or(StoreError::Truncated("evolving"))? != 0,
        }),
    };

    let count = reader.read_u8().ok_or(StoreError::Truncated("children"))?;
    let mut children = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        let sub = reader.read_u8().ok_or(StoreError::Truncated("children"))?;
        children.push((sub, read_item(reader, depth + 1)?));
    }

    Ok(ItemRecord {
        definition_id,
        charges,
        color,
        instance_no_drop,
        serial_number,
        custom_data,
        evolving,
        children,
    })
}

fn read_text(reader: &mut RecordReader<'_>) -> StoreResult<String> {
    match reader.read_string() {
        Some(Ok(text)) => Ok(text.to_string()),
        Some(Err(err)) => Err(StoreError::Config(format!("custom data is not UTF-8: {err}"))),
        None => Err(StoreError::Truncated("custom data")),
    }
}

pub fn to_base64(data: &[u8]) -> String {
    BASE64_ENGINE.encode(data)
}

pub fn from_base64(text: &str) -> StoreResult<Vec<u8>> {
    Ok(BASE64_ENGINE.decode(text.trim())?)
}
