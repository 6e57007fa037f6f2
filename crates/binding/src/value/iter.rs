//! Iteration over the structural relationships between values.
//!
//! Each iterator walks one of inkwell's sibling chains or counts through an
//! indexed list. The cursor it holds is dropped as soon as the sequence is
//! exhausted, after which the iterator keeps returning [`None`]. Iterators are
//! single-pass and cannot be restarted.

use std::{ffi::c_uint, iter::FusedIterator, rc::Rc};

use inkwell::{
    basic_block::BasicBlock,
    values::{FunctionValue, GlobalValue, InstructionValue, PhiValue},
};

use crate::value::{handle::Handle, Parents, Provenance, ValueRef};

/// The position reached in one of the sequences that a [`ValueIter`] walks.
enum Cursor<'m> {
    Blocks(Option<BasicBlock<'m>>),
    Instructions(Option<InstructionValue<'m>>),
    Params {
        function: FunctionValue<'m>,
        index:    u32,
        count:    u32,
    },
    Functions(Option<FunctionValue<'m>>),
    Globals(Option<GlobalValue<'m>>),
    Operands {
        user:  Handle<'m>,
        index: u32,
        count: u32,
    },
    Incoming {
        phi:   PhiValue<'m>,
        index: u32,
        count: u32,
    },
}

impl<'m> Cursor<'m> {
    fn advance(&mut self) -> Option<Handle<'m>> {
        match self {
            Self::Blocks(next) => {
                let current = (*next)?;
                *next = current.get_next_basic_block();
                Some(current.into())
            }
            Self::Instructions(next) => {
                let current = (*next)?;
                *next = current.get_next_instruction();
                Some(current.into())
            }
            Self::Functions(next) => {
                let current = (*next)?;
                *next = current.get_next_function();
                Some(current.into())
            }
            Self::Globals(next) => {
                let current = (*next)?;
                *next = current.get_next_global();
                Some(current.into())
            }
            Self::Params { function, index, count } => {
                if *index >= *count {
                    return None;
                }
                // Intrinsics may take metadata, which inkwell's parameter
                // wrappers cannot hold.
                let param = if function.get_intrinsic_id() == 0 {
                    function.get_nth_param(*index)?.into()
                } else {
                    Handle::param(*function, *index)
                };
                *index += 1;
                Some(param)
            }
            Self::Operands { user, index, count } => {
                if *index >= *count {
                    return None;
                }
                let operand = user.operand(*index)?;
                *index += 1;
                Some(operand)
            }
            Self::Incoming { phi, index, count } => {
                if *index >= *count {
                    return None;
                }
                let (_, block) = phi.get_incoming(*index)?;
                *index += 1;
                Some(block.into())
            }
        }
    }
}

/// An iterator that yields a [`ValueRef`] for each element of a sequence, all
/// sharing the same provenance and parents.
pub struct ValueIter<'m> {
    /// The cursor, present until the sequence is exhausted.
    cursor: Option<Cursor<'m>>,

    /// The provenance given to every value produced.
    provenance: Provenance,

    /// The parents shared by every value produced, keeping the owner alive.
    parents: Rc<Parents<'m>>,
}

impl<'m> ValueIter<'m> {
    fn new(cursor: Cursor<'m>, provenance: Provenance, parents: Rc<Parents<'m>>) -> Self {
        Self {
            cursor: Some(cursor),
            provenance,
            parents,
        }
    }

    pub(crate) fn blocks(function: FunctionValue<'m>, parents: Rc<Parents<'m>>) -> Self {
        let cursor = Cursor::Blocks(function.get_first_basic_block());
        Self::new(cursor, Provenance::Block, parents)
    }

    pub(crate) fn params(function: FunctionValue<'m>, parents: Rc<Parents<'m>>) -> Self {
        let cursor = Cursor::Params {
            function,
            index: 0,
            count: function.count_params(),
        };
        Self::new(cursor, Provenance::Argument, parents)
    }

    pub(crate) fn instructions(block: BasicBlock<'m>, parents: Rc<Parents<'m>>) -> Self {
        let cursor = Cursor::Instructions(block.get_first_instruction());
        Self::new(cursor, Provenance::Instruction, parents)
    }

    pub(crate) fn functions(first: Option<FunctionValue<'m>>, parents: Rc<Parents<'m>>) -> Self {
        Self::new(Cursor::Functions(first), Provenance::Function, parents)
    }

    pub(crate) fn globals(first: Option<GlobalValue<'m>>, parents: Rc<Parents<'m>>) -> Self {
        Self::new(Cursor::Globals(first), Provenance::Global, parents)
    }

    pub(crate) fn operands(user: Handle<'m>, parents: Rc<Parents<'m>>) -> Self {
        let cursor = Cursor::Operands {
            user,
            index: 0,
            count: user.operand_count(),
        };
        Self::new(cursor, Provenance::Operand, parents)
    }

    pub(crate) fn incoming(phi: PhiValue<'m>, parents: Rc<Parents<'m>>) -> Self {
        let cursor = Cursor::Incoming {
            phi,
            index: 0,
            count: phi.count_incoming(),
        };
        Self::new(cursor, Provenance::Block, parents)
    }

    /// Gets the provenance of the values yielded by this iterator.
    #[must_use]
    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    /// Returns `true` once the sequence has been exhausted and the cursor
    /// dropped.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.cursor.is_none()
    }
}

impl<'m> Iterator for ValueIter<'m> {
    type Item = ValueRef<'m>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.cursor.as_mut()?.advance() {
            Some(handle) => Some(ValueRef::new(handle, self.provenance, self.parents.clone())),
            None => {
                self.cursor = None;
                None
            }
        }
    }
}

impl FusedIterator for ValueIter<'_> {}

/// Iterates the basic blocks of a function.
pub type BlocksIter<'m> = ValueIter<'m>;

/// Iterates the arguments of a function.
pub type ArgumentsIter<'m> = ValueIter<'m>;

/// Iterates the instructions of a basic block.
pub type InstructionsIter<'m> = ValueIter<'m>;

/// Iterates the operands of an instruction or constant.
pub type OperandsIter<'m> = ValueIter<'m>;

/// Iterates the incoming blocks of a `phi` instruction.
pub type IncomingBlocksIter<'m> = ValueIter<'m>;

/// Iterates the functions or global variables of a module.
pub type ModuleValuesIter<'m> = ValueIter<'m>;

/// Iterates the constant indices of an `insertvalue` or `extractvalue`
/// instruction.
pub struct IndicesIter<'m> {
    /// The indices, owned by the instruction.
    indices: *const c_uint,

    /// The number of indices.
    count: c_uint,

    /// The position of the next index to yield.
    position: c_uint,

    /// Keeps the owning instruction alive.
    _parents: Rc<Parents<'m>>,
}

impl<'m> IndicesIter<'m> {
    pub(crate) fn new(indices: *const c_uint, count: c_uint, parents: Rc<Parents<'m>>) -> Self {
        let count = if indices.is_null() { 0 } else { count };
        Self {
            indices,
            count,
            position: 0,
            _parents: parents,
        }
    }
}

impl Iterator for IndicesIter<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.count {
            return None;
        }
        // SAFETY: LLVM guarantees that the index array holds `count` entries,
        // and the instruction owning it is kept alive by our parents.
        let index = unsafe { *self.indices.add(self.position as usize) };
        self.position += 1;
        Some(index)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.count - self.position) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for IndicesIter<'_> {}

impl FusedIterator for IndicesIter<'_> {}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use irlens_errors::binding::Error;

    use crate::{test_utils::with_structure_module, value::Provenance};

    #[test]
    fn visits_every_element_once_in_order() -> anyhow::Result<()> {
        with_structure_module(|module| {
            let sum = module.get_function("sum").expect("sum exists");

            let mut block_names = Vec::new();
            let mut opcodes = Vec::new();
            let mut seen = HashSet::new();
            let mut operand_count = 0;

            for block in sum.blocks()? {
                assert_eq!(block.provenance(), Provenance::Block);
                block_names.push(block.name()?);
                for inst in block.instructions()? {
                    assert!(seen.insert(inst.clone()), "instruction visited twice");
                    opcodes.push(inst.opcode()?);
                    operand_count += inst.operands()?.count();
                }
            }

            assert_eq!(block_names, ["entry", "then", "else", "join"]);
            assert_eq!(opcodes, ["icmp", "br", "add", "br", "sub", "br", "phi", "ret"]);
            assert_eq!(operand_count, 14);
            Ok(())
        })
    }

    #[test]
    fn iterators_stay_exhausted() -> anyhow::Result<()> {
        with_structure_module(|module| {
            let sum = module.get_function("sum").expect("sum exists");
            let mut args = sum.arguments()?;
            assert_eq!(args.next().map(|a| a.name()).transpose()?.as_deref(), Some("a"));
            assert_eq!(args.next().map(|a| a.name()).transpose()?.as_deref(), Some("b"));
            assert!(!args.is_exhausted());
            assert!(args.next().is_none());
            assert!(args.is_exhausted());
            assert!(args.next().is_none());
            Ok(())
        })
    }

    #[test]
    fn iterates_phi_incoming_blocks() -> anyhow::Result<()> {
        with_structure_module(|module| {
            let sum = module.get_function("sum").expect("sum exists");
            let join = sum.blocks()?.last().expect("sum has blocks");
            let phi = join.instructions()?.next().expect("join is not empty");

            let incoming = phi
                .incoming_blocks()?
                .map(|b| b.name())
                .collect::<Result<Vec<_>, Error>>()?;
            assert_eq!(incoming, ["then", "else"]);
            Ok(())
        })
    }

    #[test]
    fn iterates_aggregate_indices() -> anyhow::Result<()> {
        with_structure_module(|module| {
            let memory = module.get_function("memory").expect("memory exists");
            let entry = memory.blocks()?.next().expect("memory has a block");
            let insts = entry.instructions()?.collect::<Vec<_>>();

            let insert = &insts[3];
            assert_eq!(insert.opcode()?, "insertvalue");
            assert_eq!(insert.indices()?.collect::<Vec<_>>(), [1, 1]);

            let extract = &insts[4];
            assert_eq!(extract.opcode()?, "extractvalue");
            let indices = extract.indices()?;
            assert_eq!(indices.len(), 2);
            assert_eq!(indices.collect::<Vec<_>>(), [1, 1]);

            assert!(matches!(insts[0].indices(), Err(Error::UnexpectedValue { .. })));
            Ok(())
        })
    }

    #[test]
    fn children_keep_their_parents() -> anyhow::Result<()> {
        with_structure_module(|module| {
            let sum = module.get_function("sum").expect("sum exists");
            let block = sum.blocks()?.next().expect("sum has blocks");
            let inst = block.instructions()?.next().expect("entry is not empty");
            let operand = inst.operands()?.next().expect("icmp has operands");

            assert!(block.module().is_some());
            assert_eq!(block.function(), Some(&sum));
            assert_eq!(inst.block(), Some(&block));
            assert_eq!(inst.function(), Some(&sum));
            assert_eq!(operand.instruction(), Some(&inst));
            assert_eq!(operand.provenance(), Provenance::Operand);
            Ok(())
        })
    }
}
