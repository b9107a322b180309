#[cfg(test)]
mod common;



#[cfg(test)]
mod script_test;
