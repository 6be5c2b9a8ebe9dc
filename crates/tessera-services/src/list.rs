//! List transactions — the protocol bound to ordered sequences.
//!
//! Sending slices by index range; receiving appends each chunk to the end
//! of a growing `Vec`. Appending ignores the chunk offset, which is sound
//! only because [`IncomingTransaction::receive`] already rejects anything
//! that does not start at the running offset.

use tessera_core::wire::TransactionHeader;

use crate::incoming::IncomingTransaction;
use crate::outgoing::OutgoingTransaction;

pub type ListSlicer<E> = fn(&[E], usize, usize) -> Vec<E>;
pub type ListAggregator<E> = fn(&mut Vec<E>, Vec<E>, usize);

pub type OutgoingList<'a, E> = OutgoingTransaction<'a, [E], Vec<E>, ListSlicer<E>>;
pub type IncomingList<E> = IncomingTransaction<Vec<E>, Vec<E>, ListAggregator<E>>;

pub struct ListTransaction;

impl ListTransaction {
    pub fn send<E: Clone>(list: &[E]) -> OutgoingList<'_, E> {
        OutgoingTransaction::new(list, list.len(), slice_list::<E> as ListSlicer<E>)
    }

    pub fn receive<E>(header: TransactionHeader) -> IncomingList<E> {
        IncomingTransaction::new(header, Vec::new(), append_list::<E> as ListAggregator<E>)
    }
}

fn slice_list<E: Clone>(list: &[E], start: usize, end: usize) -> Vec<E> {
    list[start..end].to_vec()
}

fn append_list<E>(aggregate: &mut Vec<E>, chunk: Vec<E>, _offset: usize) {
    aggregate.extend(chunk);
}
