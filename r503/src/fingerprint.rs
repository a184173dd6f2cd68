//! Capture, matching and library commands

use tracing::{debug, info};

use r503_core::Command;

use crate::{device::Device, error::Result, reply::Reply, system::body_u16};

/// Result of a library search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchMatch {
    /// Library location of the best match
    pub location: u16,

    /// Match score
    pub score: u16,
}

impl Device {
    /// Capture a finger image (`GenImg`)
    pub fn gen_image(&mut self) -> Result<Reply<()>> {
        Ok(self.send_command(&Command::GenImg)?.discard())
    }

    /// Capture a finger image, failing on poor quality (`GetImageEx`)
    pub fn get_image_extended(&mut self) -> Result<Reply<()>> {
        Ok(self.send_command(&Command::GetImageEx)?.discard())
    }

    /// Extract features from the image into `buffer` (`Img2Tz`)
    pub fn image_to_feature(&mut self, buffer: u8) -> Result<Reply<()>> {
        Ok(self.send_command(&Command::Img2Tz { buffer })?.discard())
    }

    /// Merge the feature buffers into a template (`RegModel`)
    pub fn register_model(&mut self) -> Result<Reply<()>> {
        Ok(self.send_command(&Command::RegModel)?.discard())
    }

    /// Store the template in `buffer` at `location` (`Store`)
    pub fn store(&mut self, buffer: u8, location: u16) -> Result<Reply<()>> {
        let reply = self.send_command(&Command::Store { buffer, location })?;
        if reply.is_success() {
            info!("Template stored at {}", location);
        }
        Ok(reply.discard())
    }

    /// Load the template at `location` into `buffer` (`LoadChar`)
    pub fn load_template(&mut self, buffer: u8, location: u16) -> Result<Reply<()>> {
        Ok(self
            .send_command(&Command::LoadChar { buffer, location })?
            .discard())
    }

    /// Delete `count` templates from `location` on (`DeletChar`)
    pub fn delete(&mut self, location: u16, count: u16) -> Result<Reply<()>> {
        let reply = self.send_command(&Command::DeletChar { location, count })?;
        if reply.is_success() {
            debug!("Deleted {} template(s) at {}", count, location);
        }
        Ok(reply.discard())
    }

    /// Delete every template (`Empty`)
    pub fn empty_library(&mut self) -> Result<Reply<()>> {
        let reply = self.send_command(&Command::Empty)?;
        if reply.is_success() {
            info!("Library cleared");
        }
        Ok(reply.discard())
    }

    /// Compare feature buffers 1 and 2; returns the score (`Match`)
    pub fn match_templates(&mut self) -> Result<Reply<u16>> {
        self.send_command(&Command::Match)?
            .try_map(|body| body_u16(&body, 0))
    }

    /// Search `count` library slots from `start` for `buffer` (`Search`)
    pub fn search(&mut self, buffer: u8, start: u16, count: u16) -> Result<Reply<SearchMatch>> {
        self.send_command(&Command::Search {
            buffer,
            start,
            count,
        })?
        .try_map(|body| {
            Ok(SearchMatch {
                location: body_u16(&body, 0)?,
                score: body_u16(&body, 2)?,
            })
        })
    }

    /// Abort a pending capture or search (`Cancel`)
    pub fn cancel(&mut self) -> Result<Reply<()>> {
        Ok(self.send_command(&Command::Cancel)?.discard())
    }
}
