pub mod dap;
pub mod dummy;
pub mod zynq;
