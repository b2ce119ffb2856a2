//! FFR Check Input Parsers
//!
//! Streaming readers for every input format FFR Check consumes: the
//! MTL_OLF token XML, the fuseDef JSON, FLE fuse settings, UBE unit data,
//! sspec fuse strings and ITF test-log directories (plain or gzip).

pub mod fle;
pub mod fusedef;
pub mod itf;
pub mod mtl_olf;
pub mod sspec;
pub mod ube;

mod line_reader;

// 导出主要类型
pub use fle::FleFuseSet;
pub use fusedef::{parse_fusedef, FuseDefRow};
pub use itf::{
    parse_itf_directory, FullStringRow, FullStringTable, ItfDataset, ItfStats, SsidMapping, SsidTable,
    TnameRow, VisualIdFilter,
};
pub use mtl_olf::{MtlOlfDocument, MtlOlfParser, MtlOlfRow, MtlOlfStats};
pub use sspec::{QdfSelection, SspecEntry};
pub use ube::{UbeParser, UbeRecord, UbeStats};
