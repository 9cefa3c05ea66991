//! IR Module - high-level structure
//!
//! Contains the module definition, functions, basic blocks and the string
//! constant table.

use crate::instruction::Instruction;
use crate::types::IrType;
use lyra_error::CodegenError;
use std::fmt;

/// IR Module - represents a complete program
#[derive(Debug)]
pub struct Module {
    /// Module name
    pub name: String,
    /// Functions, entry function included
    pub functions: Vec<Function>,
    /// Interned string constants
    pub strings: Vec<StringConst>,
}

/// A private, null-terminated global byte array holding one string literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringConst {
    /// Global label (`.str0`, `.str1`, ...)
    pub label: String,
    /// Literal bytes, trailing NUL included
    pub bytes: Vec<u8>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functions: Vec::new(),
            strings: Vec::new(),
        }
    }

    /// Interns one string occurrence and returns the label of its global.
    ///
    /// Each occurrence gets a fresh global; duplicate payloads are not
    /// deduplicated.
    pub fn intern_string(&mut self, bytes: Vec<u8>) -> String {
        let label = format!(".str{}", self.strings.len());
        self.strings.push(StringConst {
            label: label.clone(),
            bytes,
        });
        label
    }

    /// Adds a function
    pub fn add_function(&mut self, func: Function) {
        self.functions.push(func);
    }

    /// Finds a function by name
    pub fn get_function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Finds a string constant by label
    pub fn get_string(&self, label: &str) -> Option<&StringConst> {
        self.strings.iter().find(|s| s.label == label)
    }

    /// Checks the structural invariant of every finished block: exactly one
    /// terminator, and it comes last. Run before the module is handed to a
    /// backend.
    pub fn verify(&self) -> Result<(), CodegenError> {
        for func in &self.functions {
            for block in &func.blocks {
                let terminators = block
                    .instructions
                    .iter()
                    .filter(|i| i.is_terminator())
                    .count();
                if terminators != 1 || !block.is_terminated() {
                    return Err(CodegenError::MalformedBlock {
                        function: func.name.clone(),
                        block: block.label.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; Module: {}", self.name)?;
        writeln!(f)?;

        if !self.strings.is_empty() {
            writeln!(f, "; String constants")?;
            for s in &self.strings {
                let text: String = s
                    .bytes
                    .iter()
                    .flat_map(|b| (*b as char).escape_default())
                    .collect();
                writeln!(f, "@{} = private constant c\"{}\"", s.label, text)?;
            }
            writeln!(f)?;
        }

        for func in &self.functions {
            writeln!(f, "{}", func)?;
        }

        Ok(())
    }
}

/// Function in IR
#[derive(Debug)]
pub struct Function {
    /// Function name
    pub name: String,
    /// Parameters (name, type)
    pub params: Vec<(String, IrType)>,
    /// Return type
    pub return_type: IrType,
    /// Basic blocks, entry first
    pub blocks: Vec<BasicBlock>,
    /// Next temporary ID
    next_temp: u32,
}

impl Function {
    pub fn new(name: impl Into<String>, return_type: IrType) -> Self {
        let mut func = Self {
            name: name.into(),
            params: Vec::new(),
            return_type,
            blocks: Vec::new(),
            next_temp: 0,
        };
        // Create entry block
        func.blocks.push(BasicBlock::new("entry"));
        func
    }

    /// Adds parameter
    pub fn add_param(&mut self, name: impl Into<String>, ty: IrType) {
        self.params.push((name.into(), ty));
    }

    /// Creates a new temporary
    pub fn new_temp(&mut self) -> u32 {
        let id = self.next_temp;
        self.next_temp += 1;
        id
    }

    /// Finds block by label
    pub fn get_block(&self, label: &str) -> Option<&BasicBlock> {
        self.blocks.iter().find(|b| b.label == label)
    }

    /// Returns the block instructions are currently emitted into
    pub fn current_block(&self) -> &BasicBlock {
        self.blocks.last().expect("function must have at least one block")
    }

    /// Returns the current mutable block
    pub fn current_block_mut(&mut self) -> &mut BasicBlock {
        self.blocks.last_mut().expect("function must have at least one block")
    }

    /// Creates a new block and makes it current
    pub fn new_block(&mut self, label: impl Into<String>) -> &mut BasicBlock {
        self.blocks.push(BasicBlock::new(label));
        self.blocks.last_mut().expect("block was just pushed")
    }

    /// Adds instruction to the current block
    pub fn emit(&mut self, inst: Instruction) {
        self.current_block_mut().push(inst);
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "define {}@{}(", self.return_type, self.name)?;
        for (i, (name, ty)) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} %{}", ty, name)?;
        }
        writeln!(f, ") {{")?;

        for block in &self.blocks {
            writeln!(f, "{}:", block.label)?;
            for inst in &block.instructions {
                writeln!(f, "  {}", inst)?;
            }
        }

        writeln!(f, "}}")
    }
}

/// Basic Block - straight-line instruction sequence with one terminator
#[derive(Debug)]
pub struct BasicBlock {
    /// Block label
    pub label: String,
    /// Instructions
    pub instructions: Vec<Instruction>,
}

impl BasicBlock {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            instructions: Vec::new(),
        }
    }

    /// Checks if the block ends in a terminator instruction
    pub fn is_terminated(&self) -> bool {
        self.instructions
            .last()
            .map(|i| i.is_terminator())
            .unwrap_or(false)
    }

    /// Adds instruction
    pub fn push(&mut self, inst: Instruction) {
        self.instructions.push(inst);
    }
}
