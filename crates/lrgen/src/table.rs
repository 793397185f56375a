use std::collections::HashMap;
use std::io::{self, Write};

use serde::{Deserialize, Serialize};
use serde_binary::binary_stream::Endian;

use crate::grammar::{Grammar, RuleId, TokenId, END};
use crate::lalr1;
use crate::lr0::{self, Lr0Collection, StateId};
use crate::lr1::{self, Lr1Collection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Shift(StateId),
    Goto(StateId),
    Reduce(RuleId),
    Accept,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    ShiftShift,
    ShiftReduce,
    ReduceReduce,
}

/// A second, different action requested for an occupied (state, token)
/// key. The first action stays in the table; the conflict is reported
/// instead of silently overwriting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conflict {
    pub state: StateId,
    pub token: TokenId,
    pub kept: Action,
    pub dropped: Action,
    pub kind: ConflictKind,
}

fn conflict_kind(kept: Action, dropped: Action) -> ConflictKind {
    // accept is the reduce of the augmenting rule
    let shiftish = |action: Action| matches!(action, Action::Shift(_) | Action::Goto(_));
    match (shiftish(kept), shiftish(dropped)) {
        (true, true) => ConflictKind::ShiftShift,
        (false, false) => ConflictKind::ReduceReduce,
        _ => ConflictKind::ShiftReduce,
    }
}

/// Action/goto table: (state, token) -> action, plus the ordered list
/// of conflicts seen while filling it. A table with conflicts is still
/// usable, but the grammar is not representable by the requested table
/// class; callers should check `has_conflicts` before trusting it.
#[derive(Debug, PartialEq)]
pub struct ParseTable {
    n_states: usize,
    actions: HashMap<(StateId, TokenId), Action>,
    conflicts: Vec<Conflict>,
}

impl ParseTable {
    fn with_states(n_states: usize) -> ParseTable {
        ParseTable {
            n_states,
            actions: HashMap::new(),
            conflicts: Vec::new(),
        }
    }

    fn insert(&mut self, state: StateId, token: TokenId, action: Action) {
        match self.actions.get(&(state, token)) {
            None => {
                self.actions.insert((state, token), action);
            }
            Some(&existing) if existing == action => {}
            Some(&existing) => {
                self.conflicts.push(Conflict {
                    state,
                    token,
                    kept: existing,
                    dropped: action,
                    kind: conflict_kind(existing, action),
                });
            }
        }
    }

    // shift/goto entries, probed in ascending (state, token) order so
    // the surviving action on a conflicted key is deterministic
    fn insert_transitions<F>(&mut self, grammar: &Grammar, next_state: F)
    where
        F: Fn(StateId, TokenId) -> Option<StateId>,
    {
        for state in 0..self.n_states {
            let state = StateId(state as u32);
            for token in grammar.token_ids() {
                if let Some(next) = next_state(state, token) {
                    let action = if grammar.is_terminal(token) {
                        Action::Shift(next)
                    } else {
                        Action::Goto(next)
                    };
                    self.insert(state, token, action);
                }
            }
        }
    }

    /// SLR-style table from the LR(0) collection: a completed rule
    /// reduces on every terminal in FOLLOW(left).
    pub fn from_lr0(grammar: &Grammar, collection: &Lr0Collection) -> ParseTable {
        let mut table = ParseTable::with_states(collection.len());
        table.insert_transitions(grammar, |state, token| collection.next_state(state, token));

        for state in collection.states() {
            for item in &state.items {
                if item.next_symbol(grammar).is_some() {
                    continue;
                }
                if item.rule == grammar.start_rule() {
                    table.insert(state.id, END, Action::Accept);
                } else {
                    let left = grammar.rule(item.rule).left;
                    for la in grammar.follow(left).iter() {
                        table.insert(state.id, la, Action::Reduce(item.rule));
                    }
                }
            }
        }
        table
    }

    /// Table from lookahead-carrying states: a completed rule reduces
    /// exactly on its item's lookahead. Serves both the canonical
    /// LR(1) collection and the merged LALR(1) one.
    pub fn from_lr1(grammar: &Grammar, collection: &Lr1Collection) -> ParseTable {
        let mut table = ParseTable::with_states(collection.len());
        table.insert_transitions(grammar, |state, token| collection.next_state(state, token));

        for state in collection.states() {
            for item in &state.items {
                if item.next_symbol(grammar).is_some() {
                    continue;
                }
                if item.rule == grammar.start_rule() {
                    table.insert(state.id, END, Action::Accept);
                } else {
                    table.insert(state.id, item.la, Action::Reduce(item.rule));
                }
            }
        }
        table
    }

    pub fn n_states(&self) -> usize {
        self.n_states
    }

    pub fn action(&self, state: StateId, token: TokenId) -> Option<Action> {
        self.actions.get(&(state, token)).copied()
    }

    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// Flattens the table into the dense compiled form.
    pub fn compile(&self, grammar: &Grammar) -> CompiledTable {
        let n_tokens = grammar.token_count();
        let mut data = vec![0i64; self.n_states * n_tokens];
        for (&(state, token), &action) in &self.actions {
            data[state.idx() * n_tokens + token.idx()] = encode_action(action);
        }
        CompiledTable {
            n_states: self.n_states,
            n_tokens,
            data,
        }
    }

    /// Rebuilds a table from its compiled form. Conflict information
    /// is not part of the compiled artifact.
    pub fn from_compiled(compiled: &CompiledTable, grammar: &Grammar) -> ParseTable {
        let mut actions = HashMap::new();
        for state in 0..compiled.n_states {
            for token in 0..compiled.n_tokens {
                let code = compiled.data[state * compiled.n_tokens + token];
                if code == 0 {
                    continue;
                }
                let token = TokenId(token as u32);
                actions.insert(
                    (StateId(state as u32), token),
                    decode_action(code, grammar.is_terminal(token)),
                );
            }
        }
        ParseTable {
            n_states: compiled.n_states,
            actions,
            conflicts: Vec::new(),
        }
    }
}

/// Dense row-major encoding of a parse table, for handing off to an
/// external parser driver: 0 = no action, 1 = accept, `next + 2` =
/// shift/goto (the column's terminal status disambiguates),
/// `-(rule + 1)` = reduce.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct CompiledTable {
    n_states: usize,
    n_tokens: usize,
    data: Vec<i64>,
}

fn encode_action(action: Action) -> i64 {
    match action {
        Action::Accept => 1,
        Action::Shift(next) | Action::Goto(next) => next.0 as i64 + 2,
        Action::Reduce(rule) => -(rule.0 as i64 + 1),
    }
}

fn decode_action(code: i64, terminal: bool) -> Action {
    if code == 1 {
        Action::Accept
    } else if code >= 2 {
        let next = StateId((code - 2) as u32);
        if terminal {
            Action::Shift(next)
        } else {
            Action::Goto(next)
        }
    } else {
        Action::Reduce(RuleId((-code - 1) as u32))
    }
}

impl CompiledTable {
    pub fn n_states(&self) -> usize {
        self.n_states
    }

    pub fn action_code(&self, state: usize, token: usize) -> i64 {
        self.data[state * self.n_tokens + token]
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_binary::Error> {
        serde_binary::to_vec(self, Endian::Little)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<CompiledTable, serde_binary::Error> {
        serde_binary::from_slice(bytes, Endian::Little)
    }
}

/// LR(0) collection and its SLR-style table in one call.
pub fn build_lr0_table(grammar: &Grammar) -> (Lr0Collection, ParseTable) {
    let collection = lr0::build_lr0_states(grammar);
    let table = ParseTable::from_lr0(grammar, &collection);
    (collection, table)
}

/// Canonical LR(1) collection and its table. Diagnostic path; the
/// collection can be exponentially larger than the LALR(1) one.
pub fn build_lr1_table(grammar: &Grammar) -> (Lr1Collection, ParseTable) {
    let collection = lr1::build_lr1_states(grammar);
    let table = ParseTable::from_lr1(grammar, &collection);
    (collection, table)
}

/// LALR(1) collection and its table. The production path.
pub fn build_lalr1_table(grammar: &Grammar) -> (Lr1Collection, ParseTable) {
    let collection = lalr1::build_lalr1_states(grammar);
    let table = ParseTable::from_lr1(grammar, &collection);
    (collection, table)
}

fn write_item_head<W: Write>(
    w: &mut W,
    grammar: &Grammar,
    rule_id: RuleId,
    pos: usize,
) -> io::Result<()> {
    let rule = grammar.rule(rule_id);
    write!(
        w,
        "  Rule#{}: {} ::=",
        rule_id,
        grammar.token_name(rule.left)
    )?;
    for (i, &sym) in rule.right.iter().enumerate() {
        if i == pos {
            write!(w, " .")?;
        }
        write!(w, " {}", grammar.token_name(sym))?;
    }
    if pos == rule.right.len() {
        write!(w, " .")?;
    }
    Ok(())
}

fn write_actions<W: Write>(
    w: &mut W,
    grammar: &Grammar,
    table: &ParseTable,
    state: StateId,
) -> io::Result<()> {
    for token in grammar.token_ids() {
        let action = match table.action(state, token) {
            Some(action) => action,
            None => continue,
        };
        let name = grammar.token_name(token);
        match action {
            Action::Shift(next) => writeln!(w, "  {}: shift State#{}", name, next)?,
            Action::Goto(next) => writeln!(w, "  {}: goto State#{}", name, next)?,
            Action::Reduce(rule) => writeln!(w, "  {}: reduce Rule#{}", name, rule)?,
            Action::Accept => writeln!(w, "  {}: accept", name)?,
        }
    }
    Ok(())
}

/// Human-readable dump of an LR(0) collection and its table: per
/// state, the item list followed by the action/goto entries.
pub fn dump_lr0<W: Write>(
    w: &mut W,
    grammar: &Grammar,
    collection: &Lr0Collection,
    table: &ParseTable,
) -> io::Result<()> {
    for state in collection.states() {
        writeln!(w, "State#{}:", state.id)?;
        for item in &state.items {
            write_item_head(w, grammar, item.rule, item.pos)?;
            writeln!(w)?;
        }
        write_actions(w, grammar, table, state.id)?;
        writeln!(w)?;
    }
    Ok(())
}

/// Same as [`dump_lr0`] for lookahead-carrying collections (canonical
/// LR(1) or LALR(1)). Items sharing a rule and dot position print once
/// with their lookahead set slash-separated.
pub fn dump_lr1<W: Write>(
    w: &mut W,
    grammar: &Grammar,
    collection: &Lr1Collection,
    table: &ParseTable,
) -> io::Result<()> {
    for state in collection.states() {
        writeln!(w, "State#{}:", state.id)?;
        let items = &state.items;
        let mut i = 0;
        while i < items.len() {
            let mut j = i;
            while j < items.len() && items[j].rule == items[i].rule && items[j].pos == items[i].pos
            {
                j += 1;
            }
            write_item_head(w, grammar, items[i].rule, items[i].pos)?;
            let lookaheads: Vec<&str> = items[i..j]
                .iter()
                .map(|item| grammar.token_name(item.la))
                .collect();
            writeln!(w, ", {}", lookaheads.join("/"))?;
            i = j;
        }
        write_actions(w, grammar, table, state.id)?;
        writeln!(w)?;
    }
    Ok(())
}
