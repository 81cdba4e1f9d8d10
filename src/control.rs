use crate::constants::MachineConfig;
use crate::datapath::DataPath;
use crate::error::MachineError;
use crate::io::{Io, Port, STDOUT};
use log::{debug, warn};
use simg::{MemoryCell, Opcode, Value};

/// Outcome of one fetch-decode-execute round.
pub enum TickResult {
    Running,
    Halted,
}

/// Everything the driver needs after the machine stops.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulationResult {
    pub output: Vec<Value>,
    pub instructions: u64,
    pub ticks: u64,
}

/// Fetches, decodes and executes instructions, one micro-step per tick.
///
/// Every latch, memory access or ALU round that would take a clock edge in
/// hardware bumps the tick counter exactly once, so the counter is the ground
/// truth for simulated time and part of the machine's observable behavior.
pub struct ControlUnit {
    datapath: DataPath,
    ticks: u64,
    cur_opcode: Option<Opcode>,
    cur_operand: Option<Value>,
}

impl ControlUnit {
    pub fn new(datapath: DataPath) -> ControlUnit {
        ControlUnit {
            datapath,
            ticks: 0,
            cur_opcode: None,
            cur_operand: None,
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn datapath(&self) -> &DataPath {
        &self.datapath
    }

    fn tick(&mut self) {
        self.ticks += 1;
    }

    fn read_payload(&self, addr: Value) -> Result<Value, MachineError> {
        self.datapath
            .signal_read_mem(addr)?
            .payload()
            .ok_or(MachineError::NoPayload(addr))
    }

    /// Latches the entry address out of the header into the program counter.
    pub fn init_cycle(&mut self) -> Result<(), MachineError> {
        let entry = self.read_payload(self.datapath.pc)?;
        self.datapath.signal_latch_data_tos_1(entry);
        self.tick();

        self.datapath.signal_latch_pc(self.datapath.data_tos_reg_1);
        self.tick();

        Ok(())
    }

    pub fn decode_and_execute_instruction(&mut self) -> Result<TickResult, MachineError> {
        let (opcode, operand) = match *self.datapath.signal_read_mem(self.datapath.pc)? {
            MemoryCell::Instr { opcode, arg, .. } => (opcode, arg),
            _ => return Err(MachineError::IllegalFetch(self.datapath.pc)),
        };
        self.tick();

        self.cur_opcode = Some(opcode);
        self.cur_operand = operand;

        match opcode {
            Opcode::HALT => {
                self.log_state();
                return Ok(TickResult::Halted);
            }
            Opcode::JMP => {
                let target = self.require_operand(opcode, operand)?;
                self.execute_jmp(target);
            }
            Opcode::JZ => {
                let target = self.require_operand(opcode, operand)?;
                self.execute_jz(target);
            }
            Opcode::JNZ => {
                let target = self.require_operand(opcode, operand)?;
                self.execute_jnz(target);
            }
            Opcode::CALL => {
                let target = self.require_operand(opcode, operand)?;
                self.execute_call(target)?;
            }
            Opcode::RET => self.execute_ret()?,
            Opcode::LIT => {
                let value = self.require_operand(opcode, operand)?;
                self.execute_lit(value)?;
            }
            Opcode::PUSH => {
                let addr = self.require_operand(opcode, operand)?;
                self.execute_push(addr)?;
            }
            Opcode::POP => {
                let addr = self.require_operand(opcode, operand)?;
                self.execute_pop(addr)?;
            }
            Opcode::IN => {
                let port = self.require_operand(opcode, operand)?;
                self.execute_in(port)?;
            }
            Opcode::OUT => {
                let port = self.require_operand(opcode, operand)?;
                self.execute_out(port)?;
            }
            Opcode::ADD | Opcode::SUB | Opcode::MUL | Opcode::DIV | Opcode::MOD => {
                self.execute_binary_alu(opcode)?
            }
            Opcode::INC | Opcode::DEC => self.execute_unary_alu(opcode)?,
            Opcode::CMP => self.execute_cmp()?,
            Opcode::DUP => self.execute_dup()?,
            Opcode::SWITCH => self.execute_switch()?,
            Opcode::DROP => self.execute_drop()?,
        }

        Ok(TickResult::Running)
    }

    fn require_operand(
        &self,
        opcode: Opcode,
        operand: Option<Value>,
    ) -> Result<Value, MachineError> {
        operand.ok_or(MachineError::MissingOperand(opcode))
    }

    fn execute_lit(&mut self, value: Value) -> Result<(), MachineError> {
        self.datapath.signal_latch_data_tos_1(value);
        self.tick();

        self.datapath.signal_write_data_stack(self.datapath.data_tos_reg_1)?;
        self.datapath.signal_latch_pc(self.datapath.pc + 1);
        self.tick();

        self.log_state();
        Ok(())
    }

    fn execute_binary_alu(&mut self, opcode: Opcode) -> Result<(), MachineError> {
        let operand_1 = self.datapath.signal_read_data_stack()?;
        self.datapath.signal_latch_data_tos_1(operand_1);
        self.tick();

        let operand_2 = self.datapath.signal_read_data_stack()?;
        self.datapath.signal_latch_data_tos_2(operand_2);
        self.tick();

        // The most recently pushed word is the right-hand operand.
        let result = self.datapath.alu.calculate(
            self.datapath.data_tos_reg_2,
            self.datapath.data_tos_reg_1,
            opcode,
        )?;
        self.datapath.signal_latch_data_tos_1(result);
        self.tick();

        self.datapath.signal_write_data_stack(self.datapath.data_tos_reg_1)?;
        self.datapath.signal_latch_pc(self.datapath.pc + 1);
        self.tick();

        self.log_state();
        Ok(())
    }

    fn execute_unary_alu(&mut self, opcode: Opcode) -> Result<(), MachineError> {
        let operand = self.datapath.signal_read_data_stack()?;
        self.datapath.signal_latch_data_tos_1(operand);
        self.tick();

        let result = self.datapath.alu.calculate(
            self.datapath.data_tos_reg_1,
            self.datapath.data_tos_reg_2,
            opcode,
        )?;
        self.datapath.signal_latch_data_tos_1(result);
        self.tick();

        self.datapath.signal_write_data_stack(self.datapath.data_tos_reg_1)?;
        self.tick();

        self.datapath.signal_latch_pc(self.datapath.pc + 1);
        self.tick();

        self.log_state();
        Ok(())
    }

    // Non-destructive compare: both operands go back in their original order,
    // only the Z flag keeps the difference.
    fn execute_cmp(&mut self) -> Result<(), MachineError> {
        let operand_1 = self.datapath.signal_read_data_stack()?;
        self.datapath.signal_latch_data_tos_1(operand_1);
        self.tick();

        let operand_2 = self.datapath.signal_read_data_stack()?;
        self.datapath.signal_latch_data_tos_2(operand_2);
        self.tick();

        self.datapath.alu.calculate(
            self.datapath.data_tos_reg_2,
            self.datapath.data_tos_reg_1,
            Opcode::CMP,
        )?;
        self.datapath.signal_write_data_stack(self.datapath.data_tos_reg_2)?;
        self.tick();

        self.datapath.signal_write_data_stack(self.datapath.data_tos_reg_1)?;
        self.datapath.signal_latch_pc(self.datapath.pc + 1);
        self.tick();

        self.log_state();
        Ok(())
    }

    fn execute_dup(&mut self) -> Result<(), MachineError> {
        let top = self.datapath.signal_read_data_stack()?;
        self.datapath.signal_latch_data_tos_1(top);
        self.tick();

        self.datapath.signal_write_data_stack(self.datapath.data_tos_reg_1)?;
        self.tick();

        self.datapath.signal_write_data_stack(self.datapath.data_tos_reg_1)?;
        self.tick();

        self.datapath.signal_latch_pc(self.datapath.pc + 1);
        self.tick();

        self.log_state();
        Ok(())
    }

    fn execute_switch(&mut self) -> Result<(), MachineError> {
        let operand_1 = self.datapath.signal_read_data_stack()?;
        self.datapath.signal_latch_data_tos_1(operand_1);
        self.tick();

        let operand_2 = self.datapath.signal_read_data_stack()?;
        self.datapath.signal_latch_data_tos_2(operand_2);
        self.tick();

        self.datapath.signal_write_data_stack(self.datapath.data_tos_reg_1)?;
        self.tick();

        self.datapath.signal_write_data_stack(self.datapath.data_tos_reg_2)?;
        self.tick();

        self.datapath.signal_latch_pc(self.datapath.pc + 1);
        self.tick();

        self.log_state();
        Ok(())
    }

    fn execute_drop(&mut self) -> Result<(), MachineError> {
        let top = self.datapath.signal_read_data_stack()?;
        self.datapath.signal_latch_data_tos_1(top);
        self.tick();

        self.datapath.signal_latch_pc(self.datapath.pc + 1);

        self.log_state();
        Ok(())
    }

    fn execute_out(&mut self, port: Value) -> Result<(), MachineError> {
        self.datapath.signal_latch_data_tos_1(port);
        self.tick();

        let value = self.datapath.signal_read_data_stack()?;
        self.datapath.signal_latch_data_tos_2(value);
        self.tick();

        self.datapath
            .io
            .write(Port(self.datapath.data_tos_reg_1), self.datapath.data_tos_reg_2)?;
        self.tick();

        self.datapath.signal_latch_pc(self.datapath.pc + 1);
        Ok(())
    }

    fn execute_in(&mut self, port: Value) -> Result<(), MachineError> {
        self.datapath.signal_latch_data_tos_1(port);
        self.tick();

        let value = self.datapath.io.read(Port(self.datapath.data_tos_reg_1))?;
        self.datapath.signal_latch_data_tos_1(value);
        self.tick();

        self.datapath.signal_write_data_stack(self.datapath.data_tos_reg_1)?;
        self.datapath.signal_latch_pc(self.datapath.pc + 1);
        self.tick();

        Ok(())
    }

    // Absolute load: the program counter detours to the operand address and is
    // restored from the address latch afterwards.
    fn execute_push(&mut self, addr: Value) -> Result<(), MachineError> {
        self.datapath.signal_latch_data_tos_1(addr);
        self.datapath.signal_latch_address_tos(self.datapath.pc);
        self.tick();

        self.datapath.signal_latch_pc(self.datapath.data_tos_reg_1);
        self.tick();

        let value = self.read_payload(self.datapath.pc)?;
        self.datapath.signal_latch_data_tos_1(value);
        self.tick();

        self.datapath.signal_write_data_stack(self.datapath.data_tos_reg_1)?;
        self.datapath.signal_latch_pc(self.datapath.address_tos_reg_1);
        self.tick();

        self.datapath.signal_latch_pc(self.datapath.pc + 1);
        self.tick();

        self.log_state();
        Ok(())
    }

    // Absolute store, same detour as the load.
    fn execute_pop(&mut self, addr: Value) -> Result<(), MachineError> {
        self.datapath.signal_latch_data_tos_1(addr);
        self.tick();

        let value = self.datapath.signal_read_data_stack()?;
        self.datapath.signal_latch_data_tos_2(value);
        self.datapath.signal_latch_address_tos(self.datapath.pc);
        self.tick();

        self.datapath.signal_latch_pc(self.datapath.data_tos_reg_1);
        self.tick();

        self.datapath
            .signal_write_mem(self.datapath.pc, self.datapath.data_tos_reg_2)?;
        self.tick();

        self.datapath.signal_latch_pc(self.datapath.address_tos_reg_1 + 1);
        self.tick();

        self.log_state();
        Ok(())
    }

    fn execute_jmp(&mut self, target: Value) {
        self.datapath.signal_latch_data_tos_1(target);
        self.tick();

        self.datapath.signal_latch_pc(self.datapath.data_tos_reg_1);
        self.tick();

        self.log_state();
    }

    fn execute_jz(&mut self, target: Value) {
        if self.datapath.alu.z_flag() == 0 {
            self.execute_jmp(target);
            return;
        }

        self.datapath.signal_latch_pc(self.datapath.pc + 1);
        self.tick();

        self.log_state();
    }

    fn execute_jnz(&mut self, target: Value) {
        if self.datapath.alu.z_flag() == 1 {
            self.execute_jmp(target);
            return;
        }

        self.datapath.signal_latch_pc(self.datapath.pc + 1);
        self.tick();

        self.log_state();
    }

    fn execute_call(&mut self, target: Value) -> Result<(), MachineError> {
        self.datapath.signal_latch_data_tos_1(target);
        self.tick();

        self.datapath.signal_latch_pc(self.datapath.pc + 1);
        self.tick();

        self.datapath.signal_latch_address_tos(self.datapath.pc);
        self.datapath
            .signal_write_address_stack(self.datapath.address_tos_reg_1)?;
        self.tick();

        self.datapath.signal_latch_pc(self.datapath.data_tos_reg_1);
        self.tick();

        self.log_state();
        Ok(())
    }

    fn execute_ret(&mut self) -> Result<(), MachineError> {
        let return_addr = self.datapath.signal_read_address_stack()?;
        self.datapath.signal_latch_address_tos(return_addr);
        self.tick();

        self.datapath.signal_latch_pc(self.datapath.address_tos_reg_1);
        self.tick();

        self.log_state();
        Ok(())
    }

    fn log_state(&self) {
        let command = match (self.cur_opcode, self.cur_operand) {
            (Some(opcode), Some(operand)) => format!("{} {}", opcode, operand),
            (Some(opcode), None) => opcode.to_string(),
            _ => String::new(),
        };
        debug!(
            "TICK: {:4} PC {:4} TODS1 {:4} TODS2 {:4} TOAS {:4} Z_FLAG {} {}\n       DATA_STACK {:?}\n       ADDRESS_STACK {:?}",
            self.ticks,
            self.datapath.pc,
            self.datapath.data_tos_reg_1,
            self.datapath.data_tos_reg_2,
            self.datapath.address_tos_reg_1,
            self.datapath.alu.z_flag(),
            command,
            self.datapath.data_stack(),
            self.datapath.address_stack()
        );
    }
}

/// Runs `image` against `input` until HALT or the configured instruction limit.
///
/// Hitting the limit is not an error: the machine logs a warning and reports
/// whatever output accumulated. Every fault of the data path, the ALU or the
/// port map aborts the run.
pub fn simulation(
    image: &[MemoryCell],
    input: Vec<Value>,
    config: &MachineConfig,
) -> Result<SimulationResult, MachineError> {
    let io = Io::new(input);
    let datapath = DataPath::new(image, io, config)?;
    let mut control_unit = ControlUnit::new(datapath);

    control_unit.init_cycle()?;

    let mut instructions = 0u64;
    let mut halted = false;

    while !halted && instructions < config.instructions_limit {
        if let TickResult::Halted = control_unit.decode_and_execute_instruction()? {
            halted = true;
        }
        instructions += 1;
    }

    if !halted {
        warn!("Instruction limit of {} reached", config.instructions_limit);
    }

    Ok(SimulationResult {
        output: control_unit.datapath.io.drain(STDOUT),
        instructions,
        ticks: control_unit.ticks,
    })
}
