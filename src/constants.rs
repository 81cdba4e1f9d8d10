/// Default machine dimensions. Fixed for the whole run; programs that need a
/// different machine construct their own [`MachineConfig`](struct.MachineConfig.html).
pub const MEMORY_SIZE: usize = 2048;
pub const DATA_STACK_SIZE: usize = 256;
pub const ADDRESS_STACK_SIZE: usize = 256;
pub const INSTRUCTIONS_LIMIT: u64 = 100_000;

#[derive(Clone, Copy, Debug)]
pub struct MachineConfig {
    pub memory_size: usize,
    pub data_stack_size: usize,
    pub address_stack_size: usize,
    pub instructions_limit: u64,
}

impl Default for MachineConfig {
    fn default() -> MachineConfig {
        MachineConfig {
            memory_size: MEMORY_SIZE,
            data_stack_size: DATA_STACK_SIZE,
            address_stack_size: ADDRESS_STACK_SIZE,
            instructions_limit: INSTRUCTIONS_LIMIT,
        }
    }
}
