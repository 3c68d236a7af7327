// Beacon - a location tracker for messaging-bot reporters
// Copyright (C) 2017-2018  Datong Sun (dndx@idndx.com)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

/// Runs `$action` roughly `$hz` times per second, given a loop running at
/// `$freq` Hz and a tick counter owned by the caller.
#[macro_export]
macro_rules! run_every {
    ($hz:expr, $counter:expr, $freq:expr, $action:block) => {
        $counter += 1;
        if $counter >= (($freq as f32 / $hz as f32) as u32).max(1) {
            $counter = 0;
            $action;
        }
    }
}
