//! shed cache: manage the tool cache.

use super::{new_shed, Globals};
use crate::cli::args::{CacheAction, CacheArgs};
use crate::error::ShedResult;

pub fn cache(globals: &Globals, args: CacheArgs) -> ShedResult<()> {
    let shed = new_shed(globals)?;
    match args.action {
        CacheAction::Dir => println!("{}", shed.cache_dir().display()),
        CacheAction::Clean => shed.clean_cache()?,
    }
    Ok(())
}
