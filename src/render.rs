/*
 *  render.rs
 *
 *  xlivebg - live wallpapers for the X window system
 *  (c) 2020-26 Stuart Hunter
 *
 *  Render context backends
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

//! The render context is the drawing surface a plugin renders into. Each
//! activation tears the old one down and creates a fresh one, so a plugin
//! always starts from clean state.
//!
//! The window-system side lives with the embedder. The host ships two
//! backends: [`HeadlessBackend`], which only tracks whether a context is
//! live, and [`MockBackend`], which records calls and can be told to fail.

use std::cell::RefCell;
use std::rc::Rc;

use log::debug;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to create render context: {0}")]
    CreateFailed(String),
}

/// Creates and destroys the render context
pub trait RenderBackend {
    fn create_context(&mut self) -> Result<(), RenderError>;

    fn destroy_context(&mut self);

    fn name(&self) -> &str;
}

/// Backend for running without a display
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    live: bool,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_live(&self) -> bool {
        self.live
    }
}

impl RenderBackend for HeadlessBackend {
    fn create_context(&mut self) -> Result<(), RenderError> {
        debug!("headless: context created");
        self.live = true;
        Ok(())
    }

    fn destroy_context(&mut self) {
        if self.live {
            debug!("headless: context destroyed");
        }
        self.live = false;
    }

    fn name(&self) -> &str {
        "headless"
    }
}

/// Observable state of a [`MockBackend`]
#[derive(Debug, Default)]
pub struct MockBackendState {
    pub created: usize,
    pub destroyed: usize,
    pub live: bool,
    /// Make the next `create_context` calls fail
    pub fail_create: bool,
}

/// Backend that records calls, for testing
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Rc<RefCell<MockBackendState>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the shared state, still valid after the backend is boxed
    pub fn state(&self) -> Rc<RefCell<MockBackendState>> {
        self.state.clone()
    }
}

impl RenderBackend for MockBackend {
    fn create_context(&mut self) -> Result<(), RenderError> {
        let mut state = self.state.borrow_mut();
        if state.fail_create {
            return Err(RenderError::CreateFailed("simulated failure".into()));
        }
        state.created += 1;
        state.live = true;
        Ok(())
    }

    fn destroy_context(&mut self) {
        let mut state = self.state.borrow_mut();
        state.destroyed += 1;
        state.live = false;
    }

    fn name(&self) -> &str {
        "mock"
    }
}
