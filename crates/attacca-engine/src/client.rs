//! Engine clients: the port group owned by one plugin.

use crate::error::{Error, Result};
use crate::port::{Port, PortDirection, PortKind};

/// A plugin's port group.
///
/// Created by the engine when a plugin is loaded and destroyed with it. The
/// graph only observes a client's ports while it is active, and the active
/// flag is flipped on the control thread only, never inside a process cycle.
#[derive(Debug)]
pub struct Client {
    active: bool,
    latency: u32,
    ports: Vec<Port>,
    block_size: u32,
}

impl Client {
    pub fn new(block_size: u32) -> Self {
        Self {
            active: false,
            latency: 0,
            ports: Vec::new(),
            block_size,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn latency(&self) -> u32 {
        self.latency
    }

    pub fn set_latency(&mut self, samples: u32) {
        self.latency = samples;
    }

    /// Add a port. Names are unique within the client.
    pub fn add_port(
        &mut self,
        name: &str,
        kind: PortKind,
        direction: PortDirection,
    ) -> Result<usize> {
        if self.ports.iter().any(|p| p.name() == name) {
            return Err(Error::InvalidArgument(format!(
                "duplicate port name: {name}"
            )));
        }
        let port = match kind {
            PortKind::Audio => Port::audio(name, direction, self.block_size),
            PortKind::Cv => Port::cv(name, direction, self.block_size),
            PortKind::Event => Port::event(name, direction),
        };
        self.ports.push(port);
        Ok(self.ports.len() - 1)
    }

    pub fn port_count(&self) -> usize {
        self.ports.len()
    }

    pub fn port(&self, index: usize) -> Option<&Port> {
        self.ports.get(index)
    }

    pub fn port_mut(&mut self, index: usize) -> Option<&mut Port> {
        self.ports.get_mut(index)
    }

    pub fn port_by_name(&self, name: &str) -> Option<(usize, &Port)> {
        self.ports
            .iter()
            .enumerate()
            .find(|(_, p)| p.name() == name)
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    pub fn ports_mut(&mut self) -> &mut [Port] {
        &mut self.ports
    }

    /// Indices of ports matching kind and direction, in creation order.
    pub fn port_indices(&self, kind: PortKind, direction: PortDirection) -> Vec<usize> {
        self.ports
            .iter()
            .enumerate()
            .filter(|(_, p)| p.kind() == kind && p.direction() == direction)
            .map(|(i, _)| i)
            .collect()
    }

    /// Reset every buffer for a new cycle.
    pub fn init_buffers(&mut self) {
        for port in &mut self.ports {
            port.init_buffer();
        }
    }

    /// Propagate a block-size change to every sample port.
    pub fn set_block_size(&mut self, frames: u32) {
        self.block_size = frames;
        for port in &mut self.ports {
            port.set_block_size(frames);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_client_is_inactive() {
        let client = Client::new(256);
        assert!(!client.is_active());
        assert_eq!(client.latency(), 0);
        assert_eq!(client.port_count(), 0);
    }

    #[test]
    fn test_port_names_unique_within_client() {
        let mut client = Client::new(256);
        client
            .add_port("in-left", PortKind::Audio, PortDirection::Input)
            .unwrap();
        let err = client
            .add_port("in-left", PortKind::Event, PortDirection::Input)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_port_lookup() {
        let mut client = Client::new(64);
        client
            .add_port("in-left", PortKind::Audio, PortDirection::Input)
            .unwrap();
        client
            .add_port("in-right", PortKind::Audio, PortDirection::Input)
            .unwrap();
        client
            .add_port("events-in", PortKind::Event, PortDirection::Input)
            .unwrap();

        let (index, port) = client.port_by_name("in-right").unwrap();
        assert_eq!(index, 1);
        assert_eq!(port.kind(), PortKind::Audio);

        let audio_in = client.port_indices(PortKind::Audio, PortDirection::Input);
        assert_eq!(audio_in, vec![0, 1]);
    }

    #[test]
    fn test_block_size_propagates() {
        let mut client = Client::new(64);
        client
            .add_port("out-left", PortKind::Audio, PortDirection::Output)
            .unwrap();
        client.set_block_size(128);
        assert_eq!(client.port(0).unwrap().audio_data().unwrap().len(), 128);
    }
}
