//! Fisher-flatten consensus caller.

use log::trace;

use crate::base_builder::FisherBaseBuilder;
use crate::caller::{
    ConsensusOptions, FamilyConsensus, FamilyConsensusCaller, assemble_consensus,
    single_read_consensus, validate_family,
};
use crate::errors::Result;
use crate::read::ReadRecord;
use crate::sequence::ConsensusSequence;

/// Calls each position with [`FisherBaseBuilder`] across every read of the family.
#[derive(Debug, Clone, Default)]
pub struct FisherConsensusCaller {
    options: ConsensusOptions,
}

impl FisherConsensusCaller {
    #[must_use]
    pub fn new(options: ConsensusOptions) -> Self {
        Self { options }
    }
}

impl FamilyConsensusCaller for FisherConsensusCaller {
    fn name(&self) -> &'static str {
        "fisher"
    }

    fn call(&self, family: &[ReadRecord]) -> Result<FamilyConsensus> {
        let len = validate_family(family)?;
        let first = &family[0];
        if family.len() == 1 {
            return Ok(FamilyConsensus { read: single_read_consensus(first), masked: false });
        }

        let mut builder = FisherBaseBuilder::new(self.options.underflow_quality);
        let mut seq = ConsensusSequence::with_capacity(len);
        for pos in 0..len {
            builder.reset();
            for read in family {
                builder.add(read.bases[pos], read.qualities[pos]);
            }
            let call = builder.call();
            seq.push(call.base, call.quality, call.agreement);
        }

        trace!("Called Fisher consensus for {} from {} reads", first.name, family.len());
        Ok(FamilyConsensus { read: assemble_consensus(first, family.len(), seq), masked: false })
    }
}
