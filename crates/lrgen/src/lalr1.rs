//! LALR(1) lookahead resolution: spontaneous generation plus
//! propagation over the LR(0) kernel items, then reconstitution of the
//! full item sets. The merged collection has exactly one state per
//! LR(0) state.

use std::collections::HashMap;

use crate::grammar::{Grammar, TokenSet, END};
use crate::lr0::{self, Lr0Collection, Lr0Item, StateId};
use crate::lr1::{self, Lr1Collection, Lr1Item, Lr1State};

/// Convenience entry point: LR(0) collection plus lookahead
/// resolution in one call.
pub fn build_lalr1_states(grammar: &Grammar) -> Lr1Collection {
    let lr0 = lr0::build_lr0_states(grammar);
    lalr1_from_lr0(grammar, &lr0)
}

/// Resolves LALR(1) lookaheads on top of an existing LR(0) collection.
///
/// Lookahead bookkeeping is keyed by the composite value
/// (state, rule, position) through a dense slot table; the same
/// logical kernel item accumulates a lookahead set no matter how many
/// propagation edges reach it.
pub fn lalr1_from_lr0(grammar: &Grammar, lr0: &Lr0Collection) -> Lr1Collection {
    // one slot per kernel item of every state
    let mut slots: Vec<(StateId, Lr0Item)> = Vec::new();
    let mut slot_of: HashMap<(StateId, Lr0Item), usize> = HashMap::new();
    for state in lr0.states() {
        for item in lr0.kernel_items(grammar, state.id) {
            slot_of.insert((state.id, item), slots.len());
            slots.push((state.id, item));
        }
    }

    let mut lookaheads: Vec<TokenSet> = vec![TokenSet::new(); slots.len()];
    let mut propagates: Vec<Vec<usize>> = vec![Vec::new(); slots.len()];

    // Close each kernel item on the dummy lookahead. A closure item
    // still carrying the dummy marks a propagation edge to the
    // successor kernel item; any other lookahead was spontaneously
    // generated for that successor.
    let dummy = grammar.dummy_token();
    for (src_slot, &(state_id, kernel)) in slots.iter().enumerate() {
        let seed = Lr1Item {
            rule: kernel.rule,
            pos: kernel.pos,
            la: dummy,
        };
        for item in lr1::closure(grammar, &[seed]) {
            let next = match item.next_symbol(grammar) {
                Some(next) => next,
                None => continue,
            };
            let next_state = lr0
                .next_state(state_id, next)
                .expect("goto target missing from the canonical LR(0) collection");
            let advanced = Lr0Item {
                rule: item.rule,
                pos: item.pos + 1,
            };
            let dst_slot = *slot_of
                .get(&(next_state, advanced))
                .expect("advanced item is not a kernel item of the goto state");
            if item.la == dummy {
                propagates[src_slot].push(dst_slot);
            } else {
                lookaheads[dst_slot].insert(item.la);
            }
        }
    }

    // the start item always looks ahead for end of input
    let start_item = Lr0Item {
        rule: grammar.start_rule(),
        pos: 0,
    };
    let start_slot = *slot_of
        .get(&(StateId(0), start_item))
        .expect("start item missing from state 0");
    lookaheads[start_slot].insert(END);

    // propagate along the recorded edges until nothing changes
    let mut update = true;
    while update {
        update = false;
        for src in 0..slots.len() {
            if lookaheads[src].is_empty() || propagates[src].is_empty() {
                continue;
            }
            let src_set = lookaheads[src].clone();
            for &dst in &propagates[src] {
                if lookaheads[dst].union_with(&src_set) {
                    update = true;
                }
            }
        }
    }

    // inflate the kernel-only lookahead information back into full
    // item sets, one merged state per LR(0) state
    let mut states: Vec<Lr1State> = Vec::with_capacity(lr0.len());
    for state in lr0.states() {
        let mut seeds: Vec<Lr1Item> = Vec::new();
        for item in lr0.kernel_items(grammar, state.id) {
            let slot = slot_of[&(state.id, item)];
            for la in lookaheads[slot].iter() {
                seeds.push(Lr1Item {
                    rule: item.rule,
                    pos: item.pos,
                    la,
                });
            }
        }
        states.push(Lr1State {
            id: state.id,
            items: lr1::closure(grammar, &seeds),
        });
    }

    Lr1Collection::from_parts(states, lr0.transitions().clone())
}
