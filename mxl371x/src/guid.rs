// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! MoCA GUID: the 6-byte identity of the node

use core::str::FromStr;

use rand_core::RngCore;

use crate::errors::Error;
use crate::registers::Regs;
use crate::transport::{MdioBus, MemAccess};

/// MaxLinear OUI 00:24:3e with the locally administered bit set
const GENERATED_PREFIX: [u8; 3] = [0x02, 0x24, 0x3e];
const LOCALLY_ADMINISTERED_BIT: u8 = 0x02;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct Guid(pub [u8; 6]);

/// Where a resolved GUID came from
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum GuidSource {
    /// Already programmed in the coprocessor
    Hardware,
    /// Pre-assigned by the platform configuration
    Config,
    /// Derived from the attached interface's address
    Peer,
    /// Generated from the vendor prefix and random bytes
    Random,
}

impl Guid {
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 6]
    }

    /// Hi register holds bytes 0-3, lo register bytes 4-5 in its top half
    pub fn from_regs(hi: u32, lo: u32) -> Self {
        let h = hi.to_be_bytes();
        let l = lo.to_be_bytes();
        Self([h[0], h[1], h[2], h[3], l[0], l[1]])
    }

    pub fn to_regs(&self) -> (u32, u32) {
        let b = self.0;
        (
            u32::from_be_bytes([b[0], b[1], b[2], b[3]]),
            u32::from_be_bytes([b[4], b[5], 0, 0]),
        )
    }

    /// Same address space as the peer, but never equal to it
    pub fn derive_from_peer(peer: &Guid) -> Self {
        let mut b = peer.0;
        b[0] |= LOCALLY_ADMINISTERED_BIT;
        b[5] ^= 0x01;
        Self(b)
    }

    pub fn random<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        let mut b = [0u8; 6];
        b[..3].copy_from_slice(&GENERATED_PREFIX);
        rng.fill_bytes(&mut b[3..]);
        Self(b)
    }
}

impl core::fmt::Display for Guid {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Guid {
    fn format(&self, f: defmt::Formatter) {
        let b = &self.0;
        defmt::write!(
            f,
            "{=u8:02x}:{=u8:02x}:{=u8:02x}:{=u8:02x}:{=u8:02x}:{=u8:02x}",
            b[0],
            b[1],
            b[2],
            b[3],
            b[4],
            b[5]
        )
    }
}

/// Parses `xx:xx:xx:xx:xx:xx`, `-` is accepted as separator too.
/// Surrounding whitespace is ignored.
impl FromStr for Guid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().as_bytes();
        if s.len() != 17 {
            return Err(Error::GuidParse);
        }
        let mut out = [0u8; 6];
        for (i, byte) in out.iter_mut().enumerate() {
            let pos = i * 3;
            if i < 5 && !matches!(s[pos + 2], b':' | b'-') {
                return Err(Error::GuidParse);
            }
            let pair = core::str::from_utf8(&s[pos..pos + 2]).map_err(|_| Error::GuidParse)?;
            if !pair.bytes().all(|c| c.is_ascii_hexdigit()) {
                return Err(Error::GuidParse);
            }
            *byte = u8::from_str_radix(pair, 16).map_err(|_| Error::GuidParse)?;
        }
        Ok(Self(out))
    }
}

pub(crate) fn read_guid<B: MdioBus>(mem: &mut MemAccess<B>) -> Result<Guid, Error> {
    let hi = mem.read32(Regs::GuidHi.into())?;
    let lo = mem.read32(Regs::GuidLo.into())?;
    Ok(Guid::from_regs(hi, lo))
}

pub(crate) fn write_guid<B: MdioBus>(mem: &mut MemAccess<B>, guid: &Guid) -> Result<(), Error> {
    if guid.is_zero() {
        return Err(Error::InvalidGuid);
    }
    let (hi, lo) = guid.to_regs();
    mem.write32(Regs::GuidHi.into(), hi)?;
    mem.write32(Regs::GuidLo.into(), lo)
}

/// First usable source wins: hardware, configuration, peer, random.
/// Only a new value is written back.
pub(crate) fn resolve<B: MdioBus, R: RngCore + ?Sized>(
    mem: &mut MemAccess<B>,
    configured: Option<Guid>,
    peer: Option<Guid>,
    rng: &mut R,
) -> Result<(Guid, GuidSource), Error> {
    if let Ok(existing) = read_guid(mem) {
        if !existing.is_zero() {
            return Ok((existing, GuidSource::Hardware));
        }
    }
    let (guid, source) = configured
        .filter(|g| !g.is_zero())
        .map(|g| (g, GuidSource::Config))
        .or_else(|| {
            peer.filter(|p| !p.is_zero())
                .map(|p| (Guid::derive_from_peer(&p), GuidSource::Peer))
        })
        .unwrap_or_else(|| (Guid::random(rng), GuidSource::Random));
    write_guid(mem, &guid)?;
    Ok((guid, source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimBus;
    use std::string::ToString;

    /// Deterministic generator that counts how often it was asked
    #[derive(Default)]
    struct CountingRng {
        calls: u32,
    }

    impl RngCore for CountingRng {
        fn next_u32(&mut self) -> u32 {
            self.calls += 1;
            0xa5a5_a5a5
        }
        fn next_u64(&mut self) -> u64 {
            self.calls += 1;
            0xa5a5_a5a5_a5a5_a5a5
        }
        fn fill_bytes(&mut self, dst: &mut [u8]) {
            self.calls += 1;
            for (i, b) in dst.iter_mut().enumerate() {
                *b = 0x10 + i as u8;
            }
        }
    }

    const PEER: Guid = Guid::new([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);

    #[test]
    fn test_register_layout() {
        let g = Guid::new([0x02, 0x24, 0x3e, 0x01, 0x02, 0x03]);
        assert_eq!(g.to_regs(), (0x0224_3e01, 0x0203_0000));
        assert_eq!(Guid::from_regs(0x0224_3e01, 0x0203_ffff), g);
    }

    #[test]
    fn test_parse_and_format() {
        let g: Guid = "02:24:3E:0a:0b:0c\n".parse().unwrap();
        assert_eq!(g.0, [0x02, 0x24, 0x3e, 0x0a, 0x0b, 0x0c]);
        assert_eq!(g.to_string(), "02:24:3e:0a:0b:0c");
        assert_eq!("02-24-3e-0a-0b-0c".parse::<Guid>(), Ok(g));
        assert_eq!("02:24:3e:0a:0b".parse::<Guid>(), Err(Error::GuidParse));
        assert_eq!("02:24:3e:0a:0b:zz".parse::<Guid>(), Err(Error::GuidParse));
        assert_eq!("02:24:3e;0a:0b:0c".parse::<Guid>(), Err(Error::GuidParse));
        assert_eq!("+2:24:3e:0a:0b:0c".parse::<Guid>(), Err(Error::GuidParse));
    }

    #[test]
    fn test_existing_hardware_value_wins() {
        let mut sim = SimBus::new();
        sim.poke(Regs::GuidLo.into(), 0x0001_0000);
        let mut mem = MemAccess::new(sim);
        let mut rng = CountingRng::default();
        let (guid, source) = resolve(
            &mut mem,
            Some(Guid::new([2, 0, 0, 0, 0, 9])),
            Some(PEER),
            &mut rng,
        )
        .unwrap();
        assert_eq!(source, GuidSource::Hardware);
        assert_eq!(guid, Guid::new([0, 0, 0, 0, 0, 1]));
        assert_eq!(rng.calls, 0);
        assert_eq!(mem.bus().peek(Regs::GuidLo.into()), 0x0001_0000);
    }

    #[test]
    fn test_configured_value_is_written_back() {
        let mut mem = MemAccess::new(SimBus::new());
        let mut rng = CountingRng::default();
        let cfg = Guid::new([0x02, 0xaa, 0xbb, 0xcc, 0xdd, 0xee]);
        let (guid, source) = resolve(&mut mem, Some(cfg), Some(PEER), &mut rng).unwrap();
        assert_eq!((guid, source), (cfg, GuidSource::Config));
        assert_eq!(rng.calls, 0);
        assert_eq!(mem.bus().peek(Regs::GuidHi.into()), 0x02aa_bbcc);
        assert_eq!(mem.bus().peek(Regs::GuidLo.into()), 0xddee_0000);
    }

    #[test]
    fn test_derived_from_peer() {
        let mut mem = MemAccess::new(SimBus::new());
        let mut rng = CountingRng::default();
        let (guid, source) = resolve(&mut mem, None, Some(PEER), &mut rng).unwrap();
        assert_eq!(source, GuidSource::Peer);
        assert_eq!(guid.0, [0x02, 0x11, 0x22, 0x33, 0x44, 0x54]);
        assert_eq!(rng.calls, 0);
    }

    #[test]
    fn test_random_fallback() {
        let mut mem = MemAccess::new(SimBus::new());
        let mut rng = CountingRng::default();
        let zero = Some(Guid::default());
        let (guid, source) = resolve(&mut mem, zero, zero, &mut rng).unwrap();
        assert_eq!(source, GuidSource::Random);
        assert_eq!(guid.0, [0x02, 0x24, 0x3e, 0x10, 0x11, 0x12]);
        assert_eq!(rng.calls, 1);
        assert_eq!(read_guid(&mut mem), Ok(guid));
    }

    #[test]
    fn test_unreadable_hardware_falls_through() {
        let mut sim = SimBus::new();
        sim.poke(Regs::GuidHi.into(), 0x1234_5678);
        sim.fail_reads_of(Regs::GuidLo.into());
        let mut mem = MemAccess::new(sim);
        let mut rng = CountingRng::default();
        let (_, source) = resolve(&mut mem, None, None, &mut rng).unwrap();
        assert_eq!(source, GuidSource::Random);
    }

    #[test]
    fn test_zero_guid_rejected() {
        let mut mem = MemAccess::new(SimBus::new());
        assert_eq!(
            write_guid(&mut mem, &Guid::default()),
            Err(Error::InvalidGuid)
        );
        assert_eq!(mem.bus().ops(), 0);
    }
}
