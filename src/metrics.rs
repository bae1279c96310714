use std::io;
use std::net::SocketAddr;
use std::thread;

use prometheus::{self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec};

pub use prometheus::Opts as MetricOpts;

use crate::errors::*;

pub struct Metrics {
    reg: prometheus::Registry,
    addr: Option<SocketAddr>,
}

impl Metrics {
    pub fn new(addr: Option<SocketAddr>) -> Metrics {
        Metrics {
            reg: prometheus::Registry::new(),
            addr,
        }
    }

    pub fn counter(&self, opts: MetricOpts) -> IntCounter {
        let c = IntCounter::with_opts(opts).unwrap();
        self.reg.register(Box::new(c.clone())).unwrap();
        c
    }

    pub fn counter_vec(&self, opts: MetricOpts, labels: &[&str]) -> IntCounterVec {
        let c = IntCounterVec::new(opts, labels).unwrap();
        self.reg.register(Box::new(c.clone())).unwrap();
        c
    }

    pub fn histogram_vec(&self, opts: HistogramOpts, labels: &[&str]) -> HistogramVec {
        let h = HistogramVec::new(opts, labels).unwrap();
        self.reg.register(Box::new(h.clone())).unwrap();
        h
    }

    /// Text exposition of everything registered so far.
    pub fn gather(&self) -> Result<String> {
        encode(&self.reg).chain_err(|| "failed to encode metrics")
    }

    /// Serves the registry over HTTP if a monitoring address was configured.
    pub fn start(&self) -> Result<()> {
        let addr = match self.addr {
            Some(addr) => addr,
            None => return Ok(()),
        };
        let server = tiny_http::Server::http(addr)
            .map_err(|e| format!("failed to start monitoring HTTP server at {}: {}", addr, e))?;
        info!("serving metrics on {}", addr);

        let reg = self.reg.clone();
        thread::Builder::new()
            .name("metrics".to_string())
            .spawn(move || loop {
                if let Err(e) = handle_request(&reg, server.recv()) {
                    error!("http error: {}", e);
                }
            })
            .chain_err(|| "failed to spawn metrics thread")?;
        Ok(())
    }
}

fn encode(reg: &prometheus::Registry) -> io::Result<String> {
    let mut buffer = vec![];
    prometheus::TextEncoder::new()
        .encode(&reg.gather(), &mut buffer)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    String::from_utf8(buffer).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn handle_request(
    reg: &prometheus::Registry,
    request: io::Result<tiny_http::Request>,
) -> io::Result<()> {
    let request = request?;
    let response = tiny_http::Response::from_string(encode(reg)?);
    request.respond(response)
}
