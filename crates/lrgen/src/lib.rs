pub mod grammar;
pub mod lalr1;
pub mod lr0;
pub mod lr1;
pub mod table;


pub use grammar::{
    FirstSet, Grammar, GrammarBuilder, GrammarError, Rule, RuleId, Token, TokenId, TokenSet, END,
};
pub use lr0::{Lr0Collection, Lr0Item, Lr0State, StateId};
pub use lr1::{Lr1Collection, Lr1Item, Lr1State};
pub use table::{
    build_lalr1_table, build_lr0_table, build_lr1_table, dump_lr0, dump_lr1, Action,
    CompiledTable, Conflict, ConflictKind, ParseTable,
};
