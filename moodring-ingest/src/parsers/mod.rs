pub mod gsr_line;
