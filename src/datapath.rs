use crate::alu::Alu;
use crate::constants::MachineConfig;
use crate::error::MachineError;
use crate::io::Io;
use simg::{MemoryCell, Value};

/// Registers, stacks, memory and the I/O port map.
///
/// The control unit drives the data path exclusively through the `signal_*`
/// methods; each corresponds to one latch or access a clock edge would commit.
/// The three top-of-stack registers are scratch latches clocked between ticks
/// and carry no meaning across instructions.
pub struct DataPath {
    pub(crate) alu: Alu,
    memory: Vec<MemoryCell>,
    data_stack: Vec<Value>,
    address_stack: Vec<Value>,
    data_stack_size: usize,
    address_stack_size: usize,
    pub(crate) data_tos_reg_1: Value,
    pub(crate) data_tos_reg_2: Value,
    pub(crate) address_tos_reg_1: Value,
    pub(crate) pc: Value,
    pub(crate) io: Io,
}

impl DataPath {
    /// Builds the data path with `image` overlaid onto zeroed memory.
    ///
    /// Cells land at their position in the image; the loader guarantees that
    /// position and declared address agree.
    pub fn new(
        image: &[MemoryCell],
        io: Io,
        config: &MachineConfig,
    ) -> Result<DataPath, MachineError> {
        if image.len() > config.memory_size {
            return Err(MachineError::ProgramTooLarge {
                cells: image.len(),
                memory: config.memory_size,
            });
        }

        let mut memory: Vec<MemoryCell> = (0..config.memory_size)
            .map(|addr| MemoryCell::data(addr, 0))
            .collect();
        for (index, cell) in image.iter().enumerate() {
            memory[index] = cell.clone();
        }

        Ok(DataPath {
            alu: Alu::new(),
            memory,
            data_stack: Vec::new(),
            address_stack: Vec::new(),
            data_stack_size: config.data_stack_size,
            address_stack_size: config.address_stack_size,
            data_tos_reg_1: 0,
            data_tos_reg_2: 0,
            address_tos_reg_1: 0,
            pc: 0,
            io,
        })
    }

    fn cell_index(&self, addr: Value) -> Result<usize, MachineError> {
        if addr < 0 || addr as usize >= self.memory.len() {
            Err(MachineError::MemoryAccess(addr))
        } else {
            Ok(addr as usize)
        }
    }

    pub(crate) fn signal_latch_pc(&mut self, value: Value) {
        self.pc = value;
    }

    pub(crate) fn signal_read_mem(&self, addr: Value) -> Result<&MemoryCell, MachineError> {
        let index = self.cell_index(addr)?;
        Ok(&self.memory[index])
    }

    /// Replaces the addressed cell with a data cell holding `value`.
    pub(crate) fn signal_write_mem(&mut self, addr: Value, value: Value) -> Result<(), MachineError> {
        let index = self.cell_index(addr)?;
        self.memory[index] = MemoryCell::data(index, value);
        Ok(())
    }

    pub(crate) fn signal_latch_data_tos_1(&mut self, value: Value) {
        self.data_tos_reg_1 = value;
    }

    pub(crate) fn signal_latch_data_tos_2(&mut self, value: Value) {
        self.data_tos_reg_2 = value;
    }

    pub(crate) fn signal_write_data_stack(&mut self, value: Value) -> Result<(), MachineError> {
        if self.data_stack.len() == self.data_stack_size {
            return Err(MachineError::DataStackOverflow);
        }
        self.data_stack.push(value);
        Ok(())
    }

    pub(crate) fn signal_read_data_stack(&mut self) -> Result<Value, MachineError> {
        self.data_stack.pop().ok_or(MachineError::DataStackUnderflow)
    }

    pub(crate) fn signal_latch_address_tos(&mut self, value: Value) {
        self.address_tos_reg_1 = value;
    }

    pub(crate) fn signal_write_address_stack(&mut self, value: Value) -> Result<(), MachineError> {
        if self.address_stack.len() == self.address_stack_size {
            return Err(MachineError::AddressStackOverflow);
        }
        self.address_stack.push(value);
        Ok(())
    }

    pub(crate) fn signal_read_address_stack(&mut self) -> Result<Value, MachineError> {
        self.address_stack
            .pop()
            .ok_or(MachineError::AddressStackUnderflow)
    }

    pub fn data_stack(&self) -> &[Value] {
        &self.data_stack
    }

    pub fn address_stack(&self) -> &[Value] {
        &self.address_stack
    }

    pub fn pc(&self) -> Value {
        self.pc
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::constants::MachineConfig;

    fn datapath(config: &MachineConfig) -> DataPath {
        DataPath::new(&[MemoryCell::header(1)], Io::new(Vec::new()), config).unwrap()
    }

    #[test]
    fn untouched_memory_reads_as_zero_data() {
        let datapath = datapath(&MachineConfig::default());

        assert_eq!(
            *datapath.signal_read_mem(100).unwrap(),
            MemoryCell::data(100, 0)
        );
    }

    #[test]
    fn memory_access_is_bounds_checked() {
        let config = MachineConfig {
            memory_size: 16,
            ..MachineConfig::default()
        };
        let mut datapath = datapath(&config);

        assert_eq!(
            datapath.signal_read_mem(16).unwrap_err(),
            MachineError::MemoryAccess(16)
        );
        assert_eq!(
            datapath.signal_read_mem(-1).unwrap_err(),
            MachineError::MemoryAccess(-1)
        );
        assert_eq!(
            datapath.signal_write_mem(16, 1).unwrap_err(),
            MachineError::MemoryAccess(16)
        );
    }

    #[test]
    fn memory_write_replaces_with_data_cell() {
        let mut datapath = datapath(&MachineConfig::default());

        datapath.signal_write_mem(5, 42).unwrap();
        assert_eq!(*datapath.signal_read_mem(5).unwrap(), MemoryCell::data(5, 42));
    }

    #[test]
    fn stacks_are_bounded() {
        let config = MachineConfig {
            data_stack_size: 2,
            address_stack_size: 1,
            ..MachineConfig::default()
        };
        let mut datapath = datapath(&config);

        datapath.signal_write_data_stack(1).unwrap();
        datapath.signal_write_data_stack(2).unwrap();
        assert_eq!(
            datapath.signal_write_data_stack(3).unwrap_err(),
            MachineError::DataStackOverflow
        );

        datapath.signal_write_address_stack(1).unwrap();
        assert_eq!(
            datapath.signal_write_address_stack(2).unwrap_err(),
            MachineError::AddressStackOverflow
        );
    }

    #[test]
    fn empty_stacks_cannot_be_popped() {
        let mut datapath = datapath(&MachineConfig::default());

        assert_eq!(
            datapath.signal_read_data_stack().unwrap_err(),
            MachineError::DataStackUnderflow
        );
        assert_eq!(
            datapath.signal_read_address_stack().unwrap_err(),
            MachineError::AddressStackUnderflow
        );
    }

    #[test]
    fn oversized_image_is_rejected() {
        let config = MachineConfig {
            memory_size: 1,
            ..MachineConfig::default()
        };
        let image = vec![MemoryCell::header(1), MemoryCell::data(1, 0)];

        match DataPath::new(&image, Io::new(Vec::new()), &config) {
            Err(MachineError::ProgramTooLarge { cells: 2, memory: 1 }) => {}
            other => panic!("expected a load failure, got {:?}", other.err()),
        }
    }
}
