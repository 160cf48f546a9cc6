// SPDX-FileCopyrightText: 2024 bunnie <bunnie@kosagi.com>
// SPDX-License-Identifier: Apache-2.0

//! A small command-line harness that brings up the pager subsystem on the hosted simulation and
//! drives a handful of page faults from one simulated process, logging each step.

use std::sync::Arc;

use clap::{App, Arg};
use log::info;

use vm_pager::hosted::{DefaultSemaphoreFactory, RamDisk, SimMmu, ThreadRegistry};
use vm_pager::types::{Config, Pid, Privilege};
use vm_pager::Subsystem;

fn main() {
    env_logger::init();

    let matches = App::new("pager-demo")
        .about("drives a few page faults through the demand-paged virtual memory subsystem")
        .arg(Arg::with_name("pages").long("pages").takes_value(true).default_value("16"))
        .arg(Arg::with_name("frames").long("frames").takes_value(true).default_value("4"))
        .arg(Arg::with_name("pagers").long("pagers").takes_value(true).default_value("2"))
        .arg(Arg::with_name("faults").long("faults").takes_value(true).default_value("8"))
        .get_matches();

    let pages: usize = matches.value_of("pages").unwrap().parse().expect("--pages must be a number");
    let frames: usize = matches.value_of("frames").unwrap().parse().expect("--frames must be a number");
    let pagers: usize = matches.value_of("pagers").unwrap().parse().expect("--pagers must be a number");
    let fault_count: usize =
        matches.value_of("faults").unwrap().parse().expect("--faults must be a number");

    let config = Config { pages, frames, pagers };
    let mmu = Arc::new(SimMmu::new(frames));
    let disk = Arc::new(RamDisk::new(512, 64, 64));
    let registry = Arc::new(ThreadRegistry::new(pages));
    let semaphores = Arc::new(DefaultSemaphoreFactory);

    registry.register(Pid(1));

    let subsystem = Subsystem::init(
        Privilege::Kernel,
        config,
        mmu,
        disk,
        registry.clone(),
        semaphores,
    )
    .expect("subsystem init failed");

    info!("driving {fault_count} faults across {pages} pages with {frames} frames / {pagers} pagers");
    for i in 0..fault_count {
        let page = i % pages;
        subsystem.handle_fault(page * vm_pager::swap::PAGE_SIZE).expect("subsystem not initialized");
        info!(
            "fault {i} resolved (page {page}), free frames = {}",
            subsystem.free_frame_count().unwrap()
        );
    }
}
