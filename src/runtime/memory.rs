use crate::runtime::runtime_error::VmError;

/// Flat array of numeric cells addressed by `register + offset`.
#[derive(Debug, Clone)]
pub struct Memory {
    cells: Vec<f64>,
}

impl Memory {
    /// Zero-filled memory with `size` cells.
    pub fn new(size: usize) -> Self {
        Memory {
            cells: vec![0.0; size],
        }
    }

    pub fn size(&self) -> usize {
        self.cells.len()
    }

    /// Converts a computed address to a cell index.
    ///
    /// The address must be a non-negative integer below the memory size.
    fn index(&self, address: f64, ip: usize) -> Result<usize, VmError> {
        if address < 0.0 || address.fract() != 0.0 || address >= self.cells.len() as f64 {
            return Err(VmError::OutOfRange {
                ip,
                address,
                size: self.cells.len(),
            });
        }
        Ok(address as usize)
    }

    pub fn read(&self, address: f64, ip: usize) -> Result<f64, VmError> {
        let idx = self.index(address, ip)?;
        Ok(self.cells[idx])
    }

    pub fn write(&mut self, address: f64, value: f64, ip: usize) -> Result<(), VmError> {
        let idx = self.index(address, ip)?;
        self.cells[idx] = value;
        Ok(())
    }

    pub fn cells(&self) -> &[f64] {
        &self.cells
    }
}
