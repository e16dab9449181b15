pub mod formatter;

pub use formatter::{
    format_composite, format_gate_report, format_hidden_gems, format_json, format_rank_table,
    format_tier_summary, format_tsv, should_use_colors,
};
