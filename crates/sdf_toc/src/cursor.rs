//! Sequential reading over a [`Block`]
//!

use byteorder::{ByteOrder, LittleEndian};

use crate::{
    block::{check_range, to_usize, Block},
    error::{Error, FormatError, Result},
};

/// A fixed size record that can be decoded from its exact byte layout
pub trait Record: Sized {
    /// Number of bytes the record occupies on disk
    const SIZE: usize;

    /// Decode the record from exactly [`Record::SIZE`] bytes
    fn parse(bytes: &[u8]) -> Result<Self>;
}

impl Record for u8 {
    const SIZE: usize = 1;

    fn parse(bytes: &[u8]) -> Result<Self> {
        Ok(bytes[0])
    }
}

impl Record for u16 {
    const SIZE: usize = 2;

    fn parse(bytes: &[u8]) -> Result<Self> {
        Ok(LittleEndian::read_u16(bytes))
    }
}

impl Record for u32 {
    const SIZE: usize = 4;

    fn parse(bytes: &[u8]) -> Result<Self> {
        Ok(LittleEndian::read_u32(bytes))
    }
}

impl Record for u64 {
    const SIZE: usize = 8;

    fn parse(bytes: &[u8]) -> Result<Self> {
        Ok(LittleEndian::read_u64(bytes))
    }
}

/// Where a [`BlockCursor::seek`] is measured from
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SeekOrigin {
    /// From the start of the block
    Begin,

    /// Forward from the current position
    Current,

    /// Backward from the end of the block
    End,
}

/// A read position over a [`Block`]
///
/// Every read either consumes exactly the bytes it returns or fails without moving the
/// position.
#[derive(Debug, Clone)]
pub struct BlockCursor {
    block: Block,
    position: u64,
}

impl BlockCursor {
    /// Create a cursor positioned at the start of `block`
    pub fn new(block: Block) -> Self {
        BlockCursor { block, position: 0 }
    }

    /// The block being read
    pub fn block(&self) -> &Block {
        &self.block
    }

    /// Unwrap and return the inner block
    pub fn into_inner(self) -> Block {
        self.block
    }

    /// Size of the underlying block
    pub fn size(&self) -> u64 {
        self.block.size()
    }

    /// Current read position
    pub fn tell(&self) -> u64 {
        self.position
    }

    /// Whether every byte has been consumed
    pub fn eof(&self) -> bool {
        self.position == self.size()
    }

    /// Number of bytes left after the current position
    pub fn remaining(&self) -> u64 {
        self.size() - self.position
    }

    /// Move the read position, returning the new position
    pub fn seek(&mut self, value: u64, origin: SeekOrigin) -> Result<u64> {
        let size = self.size();
        let target = match origin {
            SeekOrigin::Begin => Some(value),
            SeekOrigin::Current => self.position.checked_add(value),
            SeekOrigin::End => size.checked_sub(value),
        };

        match target {
            Some(target) if target <= size => {
                self.position = target;
                Ok(target)
            }
            _ => Err(Error::OutOfRange {
                offset: self.position,
                length: value,
                size,
            }),
        }
    }

    /// Fill `buffer` from the current position
    pub fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<()> {
        self.block.read(buffer, self.position)?;
        self.position += buffer.len() as u64;
        Ok(())
    }

    /// Read the next `length` bytes into a new buffer
    pub fn read_vec(&mut self, length: u64) -> Result<Vec<u8>> {
        let buffer = self.block.read_vec(self.position, length)?;
        self.position += length;
        Ok(buffer)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.read()
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.read()
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.read()
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.read()
    }

    /// Read a little endian unsigned integer stored in `width` bytes
    ///
    /// A width of zero reads nothing and yields zero.
    pub fn read_varint(&mut self, width: usize) -> Result<u64> {
        match width {
            0 => Ok(0),
            1..=8 => {
                let mut buffer = [0u8; 8];
                self.read_bytes(&mut buffer[..width])?;
                Ok(LittleEndian::read_uint(&buffer, width))
            }
            _ => Err(FormatError::VarintWidth { width }.into()),
        }
    }

    /// Read the next fixed size record
    pub fn read<T: Record>(&mut self) -> Result<T> {
        let mut buffer = [0u8; 16];
        if T::SIZE <= buffer.len() {
            self.block.read(&mut buffer[..T::SIZE], self.position)?;
            let value = T::parse(&buffer[..T::SIZE])?;
            self.position += T::SIZE as u64;
            return Ok(value);
        }

        let bytes = self.block.read_vec(self.position, T::SIZE as u64)?;
        let value = T::parse(&bytes)?;
        self.position += T::SIZE as u64;
        Ok(value)
    }

    /// Read `count` consecutive fixed size records
    pub fn read_array<T: Record>(&mut self, count: usize) -> Result<Vec<T>> {
        let length = (count as u64)
            .checked_mul(T::SIZE as u64)
            .ok_or(Error::OutOfRange {
                offset: self.position,
                length: u64::MAX,
                size: self.size(),
            })?;

        let bytes = self.block.read_vec(self.position, length)?;
        let items = bytes
            .chunks_exact(T::SIZE)
            .map(T::parse)
            .collect::<Result<Vec<_>>>()?;

        self.position += length;
        Ok(items)
    }

    /// Read `count` consecutive fixed size records into a bounds checked view
    pub fn read_array_view<T: Record>(&mut self, count: usize) -> Result<ArrayView<T>> {
        self.read_array(count).map(ArrayView::from)
    }

    /// Take the next `length` bytes as a view of the underlying block
    pub fn part(&mut self, length: u64) -> Result<Block> {
        let part = self.block.part(self.position, length)?;
        self.position += length;
        Ok(part)
    }

    /// Take every byte after the current position as a view of the underlying block
    pub fn remainder(&mut self) -> Result<Block> {
        self.part(self.remaining())
    }

    /// Advance to the next multiple of `boundary`, if not already on one
    pub fn align(&mut self, boundary: u64) -> Result<u64> {
        if boundary == 0 {
            return Err(FormatError::InvalidAlignment.into());
        }

        let excess = self.position % boundary;
        if excess != 0 {
            let padding = boundary - excess;
            check_range(self.position, padding, self.size())?;
            self.position += padding;
        }

        Ok(self.position)
    }
}

/// A materialized, bounds checked sequence of fixed size records
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayView<T> {
    items: Vec<T>,
}

impl<T> ArrayView<T> {
    /// Number of records
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there are no records
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get the record at `index`
    pub fn get(&self, index: usize) -> Result<&T> {
        self.items.get(index).ok_or(Error::IndexOutOfRange {
            index,
            count: self.items.len(),
        })
    }

    /// Get the record at a 64 bit `index`, as decoded from a file
    pub fn get_u64(&self, index: u64) -> Result<&T> {
        let index = to_usize(index).map_err(|_| Error::IndexOutOfRange {
            index: usize::MAX,
            count: self.items.len(),
        })?;
        self.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T> From<Vec<T>> for ArrayView<T> {
    fn from(items: Vec<T>) -> Self {
        ArrayView { items }
    }
}

impl<'a, T> IntoIterator for &'a ArrayView<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::block::Block;
    use crate::cursor::{BlockCursor, SeekOrigin};
    use crate::error::{Error, FormatError, Result};

    fn cursor(data: &[u8]) -> BlockCursor {
        BlockCursor::new(Block::from_slice(data))
    }

    #[test]
    fn read_scalars() -> Result<()> {
        #[rustfmt::skip]
        let mut input = cursor(&[
            0x01,
            0x02, 0x03,
            0x04, 0x05, 0x06, 0x07,
            0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F,
        ]);

        assert_eq!(input.read_u8()?, 0x01);
        assert_eq!(input.tell(), 1);
        assert_eq!(input.read_u16()?, 0x0302);
        assert_eq!(input.tell(), 3);
        assert_eq!(input.read_u32()?, 0x07060504);
        assert_eq!(input.tell(), 7);
        assert_eq!(input.read_u64()?, 0x0F0E0D0C0B0A0908);
        assert!(input.eof());

        Ok(())
    }

    #[test]
    fn failed_read_keeps_position() -> Result<()> {
        let mut input = cursor(&[0x01, 0x02, 0x03]);
        input.seek(1, SeekOrigin::Begin)?;

        assert!(matches!(input.read_u32(), Err(Error::OutOfRange { .. })));
        assert_eq!(input.tell(), 1);
        assert!(input.read_array::<u16>(2).is_err());
        assert_eq!(input.tell(), 1);
        assert!(input.part(3).is_err());
        assert_eq!(input.tell(), 1);

        Ok(())
    }

    #[test]
    fn read_varints() -> Result<()> {
        let mut input = cursor(&[0x34, 0x12, 0xFF, 0x01, 0x00, 0x80]);

        assert_eq!(input.read_varint(0)?, 0);
        assert_eq!(input.tell(), 0);
        assert_eq!(input.read_varint(2)?, 0x1234);
        assert_eq!(input.read_varint(1)?, 0xFF);
        assert_eq!(input.read_varint(3)?, 0x800001);
        assert!(matches!(
            input.read_varint(9),
            Err(Error::Format(FormatError::VarintWidth { width: 9 }))
        ));

        Ok(())
    }

    #[test]
    fn seek_origins() -> Result<()> {
        let mut input = cursor(&[0u8; 10]);

        assert_eq!(input.seek(4, SeekOrigin::Begin)?, 4);
        assert_eq!(input.seek(3, SeekOrigin::Current)?, 7);
        assert_eq!(input.seek(2, SeekOrigin::End)?, 8);
        assert_eq!(input.seek(10, SeekOrigin::End)?, 0);
        assert_eq!(input.seek(10, SeekOrigin::Begin)?, 10);
        assert!(input.eof());

        assert!(input.seek(11, SeekOrigin::Begin).is_err());
        assert!(input.seek(11, SeekOrigin::End).is_err());
        assert!(input.seek(1, SeekOrigin::Current).is_err());
        assert!(input.seek(u64::MAX, SeekOrigin::Current).is_err());
        assert_eq!(input.tell(), 10);

        Ok(())
    }

    #[test]
    fn read_arrays() -> Result<()> {
        let mut input = cursor(&[0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0xAA]);

        let view = input.read_array_view::<u16>(3)?;
        assert_eq!(input.tell(), 6);
        assert_eq!(view.len(), 3);
        assert_eq!(*view.get(2)?, 3);
        assert!(matches!(
            view.get(3),
            Err(Error::IndexOutOfRange { index: 3, count: 3 })
        ));
        assert_eq!(view.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);

        assert_eq!(input.read_array::<u8>(1)?, vec![0xAA]);
        assert!(input.read_array::<u8>(usize::MAX).is_err());

        Ok(())
    }

    #[test]
    fn parts_and_remainder() -> Result<()> {
        let mut input = cursor(b"Hello World");

        let hello = input.part(5)?;
        assert_eq!(hello.to_vec()?, b"Hello".to_vec());
        assert_eq!(hello.depth(), 1);
        assert_eq!(input.tell(), 5);

        let rest = input.remainder()?;
        assert_eq!(rest.to_vec()?, b" World".to_vec());
        assert!(input.eof());
        assert!(input.remainder()?.is_empty());

        Ok(())
    }

    #[test]
    fn align_is_idempotent() -> Result<()> {
        let mut input = cursor(&[0u8; 16]);

        assert_eq!(input.align(4)?, 0);
        input.seek(5, SeekOrigin::Begin)?;
        assert_eq!(input.align(4)?, 8);
        assert_eq!(input.align(4)?, 8);

        input.seek(13, SeekOrigin::Begin)?;
        assert_eq!(input.align(8)?, 16);
        input.seek(15, SeekOrigin::Begin)?;
        assert!(input.align(32).is_err());
        assert_eq!(input.tell(), 15);
        assert!(matches!(
            input.align(0),
            Err(Error::Format(FormatError::InvalidAlignment))
        ));

        Ok(())
    }
}
